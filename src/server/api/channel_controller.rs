use axum::{
    Extension, Router,
    extract::Path,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::debug;

use crate::server::{
    error::{AppResult, Error},
    services::AppServices,
    utils::relay_utils,
};

pub struct ChannelController;

impl ChannelController {
    pub fn app() -> Router {
        Router::new()
            .route(
                "/{channel_id}/playlist",
                get(Self::playlist_get).options(Self::channel_options),
            )
            .route("/{channel_id}/seg", get(Self::segment_missing_name))
            .route(
                "/{channel_id}/seg/{name}",
                get(Self::segment_get).options(Self::channel_options),
            )
    }

    async fn playlist_get(
        Extension(services): Extension<AppServices>,
        Path(channel_id): Path<String>,
    ) -> AppResult<Response> {
        debug!("channel playlist request: {}", channel_id);

        let playlist = services.channels.channel_playlist(&channel_id).await?;

        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            header::CONTENT_TYPE,
            "application/vnd.apple.mpegurl"
                .parse()
                .expect("Static header value should parse"),
        );
        response_headers.insert(
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate"
                .parse()
                .expect("Static header value should parse"),
        );

        Ok((StatusCode::OK, response_headers, playlist).into_response())
    }

    async fn segment_get(
        Extension(services): Extension<AppServices>,
        Path((channel_id, name)): Path<(String, String)>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        let range = headers
            .get(header::RANGE)
            .and_then(|value| value.to_str().ok());

        let upstream = services
            .channels
            .relay_segment(&channel_id, &name, range)
            .await?;

        Ok(relay_utils::relay_response(upstream))
    }

    async fn segment_missing_name() -> impl IntoResponse {
        Error::BadRequest("missing segment name".to_string())
    }

    async fn channel_options() -> impl IntoResponse {
        StatusCode::OK
    }
}
