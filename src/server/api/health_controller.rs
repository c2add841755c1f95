use axum::Extension;
use axum::Json;
use chrono::Utc;

use crate::server::dtos::health_dto::HealthResponse;
use crate::server::services::AppServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint. the relay keeps all its state in process memory, so there is nothing to
/// probe beyond the process itself
pub async fn health_endpoint(Extension(services): Extension<AppServices>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: format!("{:?}", services.config.cargo_env).to_lowercase(),
    })
}
