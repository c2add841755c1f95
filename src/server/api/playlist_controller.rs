use axum::{
    Extension, Router,
    extract::Query,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::debug;

use crate::server::{
    error::{AppResult, Error},
    services::{AppServices, relay_services::PlaylistDocument},
};

#[derive(Deserialize)]
struct PlaylistQuery {
    url: Option<String>,
}

pub struct PlaylistController;

impl PlaylistController {
    pub fn app() -> Router {
        Router::new().route("/", get(Self::playlist_get).options(Self::playlist_options))
    }

    async fn playlist_get(
        Extension(services): Extension<AppServices>,
        Query(params): Query<PlaylistQuery>,
    ) -> AppResult<Response> {
        let target_url = params
            .url
            .ok_or_else(|| Error::BadRequest("missing url parameter".to_string()))?;

        debug!("playlist request: {}", target_url);

        let document = services.relay.fetch_playlist(&target_url).await?;

        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate"
                .parse()
                .expect("Static header value should parse"),
        );

        let body = match document {
            PlaylistDocument::Hls(text) => {
                response_headers.insert(
                    header::CONTENT_TYPE,
                    "application/vnd.apple.mpegurl"
                        .parse()
                        .expect("Static header value should parse"),
                );
                text
            }
            PlaylistDocument::Dash(manifest) => {
                response_headers.insert(
                    header::CONTENT_TYPE,
                    "application/dash+xml"
                        .parse()
                        .expect("Static header value should parse"),
                );
                manifest
            }
        };

        Ok((StatusCode::OK, response_headers, body).into_response())
    }

    async fn playlist_options() -> impl IntoResponse {
        StatusCode::OK
    }
}
