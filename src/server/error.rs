use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub type AppResult<T> = Result<T, Error>;

/// everything a handler can fail with, mapped onto the status the client sees.
/// upstream codes pass through as-is, the body stays a generic json error so
/// nothing from the remote side leaks to the player
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream returned {0}")]
    UpstreamStatus(StatusCode),

    #[error("bad upstream content: {0}")]
    BadUpstreamContent(String),

    #[error("auth resolution failed: {0}")]
    ResolutionFailure(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamStatus(status) => *status,
            Self::BadUpstreamContent(_) => StatusCode::BAD_GATEWAY,
            Self::ResolutionFailure(_) | Self::NetworkFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// timeouts and connection drops are the common case on these upstreams, fold
// the rest of reqwest's error surface in with them
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NetworkFailure(format!("upstream timed out: {}", err))
        } else if err.is_connect() {
            Self::NetworkFailure(format!("upstream connection failed: {}", err))
        } else {
            Self::NetworkFailure(err.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
