// subtitle conversion is a pair of regex sweeps that nothing else uses, so it lives in the
// controller instead of getting a service of its own
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
    services::AppServices,
    utils::{subtitle_utils, url_utils},
};

#[derive(Deserialize)]
struct SubtitleQuery {
    url: Option<String>,
    offset: Option<f64>,
}

pub struct SubtitleController;

impl SubtitleController {
    pub fn app() -> Router {
        Router::new().route("/", get(Self::subtitle_get).options(Self::subtitle_options))
    }

    async fn subtitle_get(
        Extension(services): Extension<AppServices>,
        Query(params): Query<SubtitleQuery>,
    ) -> AppResult<Response> {
        let target_url = params
            .url
            .ok_or_else(|| Error::BadRequest("missing url parameter".to_string()))?;

        if !url_utils::is_allowed_url(&target_url, &services.config.allowed_hosts) {
            return Err(Error::Forbidden("url host not allowed".to_string()));
        }

        debug!(
            "subtitle request: {} (offset: {:?})",
            target_url, params.offset
        );

        let response = services.http.get(&target_url).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::UpstreamStatus(status));
        }

        let raw = response.text().await?;

        let offset = params.offset.unwrap_or(0.0);
        let shifted = if offset != 0.0 {
            subtitle_utils::apply_offset(&raw, offset)
        } else {
            raw
        };

        // anything that doesn't open with a webvtt header is treated as srt
        let vtt = if shifted.trim_start().starts_with("WEBVTT") {
            shifted
        } else {
            subtitle_utils::srt_to_vtt(&shifted)
        };

        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            header::CONTENT_TYPE,
            "text/vtt; charset=utf-8"
                .parse()
                .expect("Static header value should parse"),
        );
        response_headers.insert(
            header::CACHE_CONTROL,
            "public, max-age=3600"
                .parse()
                .expect("Static header value should parse"),
        );

        Ok((StatusCode::OK, response_headers, vtt).into_response())
    }

    async fn subtitle_options() -> impl IntoResponse {
        StatusCode::OK
    }
}
