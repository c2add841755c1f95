use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::{IntoResponse, Response};

/// upstream response headers worth handing to the player, everything else stays behind
const RELAY_RESPONSE_HEADERS: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ACCEPT_RANGES,
    header::CONTENT_RANGE,
    header::CACHE_CONTROL,
];

pub fn copy_relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for name in RELAY_RESPONSE_HEADERS {
        if let Some(value) = upstream.get(&name) {
            headers.insert(name, value.clone());
        }
    }

    headers
}

/// stream an upstream segment body straight through without buffering, keeping the status
/// and only the headers the player needs
pub fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = copy_relay_headers(upstream.headers());

    (status, headers, Body::from_stream(upstream.bytes_stream())).into_response()
}
