use axum::{
    Extension, Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::server::{
    error::Error,
    resolvers::ExtractionErrorKind,
    services::AppServices,
};

#[derive(Deserialize)]
struct ExtractQuery {
    url: Option<String>,
    referer: Option<String>,
}

pub struct ExtractController;

impl ExtractController {
    pub fn app() -> Router {
        Router::new().route("/", get(Self::extract_get).options(Self::extract_options))
    }

    async fn extract_get(
        Extension(services): Extension<AppServices>,
        Query(params): Query<ExtractQuery>,
    ) -> Response {
        let Some(page_url) = params.url else {
            return Error::BadRequest("missing url parameter".to_string()).into_response();
        };

        debug!("extract request: {}", page_url);

        match services
            .resolvers
            .extract(&page_url, params.referer.as_deref())
            .await
        {
            Ok(source) => Json(source).into_response(),
            Err(e) => {
                warn!("extraction failed for {}: {}", page_url, e);
                let status = match e.kind {
                    ExtractionErrorKind::UnsupportedHost => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, Json(e)).into_response()
            }
        }
    }

    async fn extract_options() -> impl IntoResponse {
        StatusCode::OK
    }
}
