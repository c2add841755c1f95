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
    utils::relay_utils,
};

#[derive(Deserialize)]
struct SegmentQuery {
    url: Option<String>,
}

pub struct SegmentController;

impl SegmentController {
    pub fn app() -> Router {
        Router::new().route("/", get(Self::segment_get).options(Self::segment_options))
    }

    async fn segment_get(
        Extension(services): Extension<AppServices>,
        Query(params): Query<SegmentQuery>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        let target_url = params
            .url
            .ok_or_else(|| Error::BadRequest("missing url parameter".to_string()))?;

        debug!("segment request: {}", target_url);

        let range = headers
            .get(header::RANGE)
            .and_then(|value| value.to_str().ok());

        let upstream = services.relay.fetch_segment(&target_url, range).await?;

        Ok(relay_utils::relay_response(upstream))
    }

    async fn segment_options() -> impl IntoResponse {
        StatusCode::OK
    }
}
