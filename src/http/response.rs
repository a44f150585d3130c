//! HTTP response building module
//!
//! JSON bodies for the API handlers and the fallback router, plus the
//! protocol-level responses the frontend answers on its own.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::error::ApiError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Build a JSON response
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            log_build_error("JSON body", &e);
            return build_raw_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"Internal server error"}"#),
            );
        }
    };
    build_raw_json(status, Bytes::from(json))
}

/// Build the `{ "error": ... }` body for a failed request
///
/// Server-side failures get a generic message; the cause is only logged.
pub fn error_response(err: &ApiError, server_message: &str) -> Response<Full<Bytes>> {
    let message = if err.is_server_error() {
        server_message.to_string()
    } else {
        err.to_string()
    };
    json_response(err.status(), &serde_json::json!({ "error": message }))
}

/// 404 with an empty JSON object, as the fallback router answers
pub fn build_empty_404_response() -> Response<Full<Bytes>> {
    build_raw_json(StatusCode::NOT_FOUND, Bytes::from_static(b"{}"))
}

/// 405 for write verbs on read-only routes
pub fn build_405_response() -> Response<Full<Bytes>> {
    let mut resp = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "This mock server is read-only" }),
    );
    resp.headers_mut().insert(
        hyper::header::ALLOW,
        hyper::header::HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    resp
}

/// Build 413 Payload Too Large response
pub fn build_413_response(max_body_size: u64) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &serde_json::json!({ "error": format!("Request body exceeds {max_body_size} bytes") }),
    )
}

/// Liveness probe
pub fn build_health_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache")
        .body(Full::new(Bytes::from_static(b"ok")))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(Full::new(Bytes::from_static(b"ok")))
        })
}

/// Drop the body of a response to a HEAD request, keeping its length header
pub fn strip_body(resp: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let (mut parts, body) = resp.into_parts();
    if let Some(len) = hyper::body::Body::size_hint(&body).exact() {
        parts.headers.insert(hyper::header::CONTENT_LENGTH, len.into());
    }
    Response::from_parts(parts, Full::new(Bytes::new()))
}

fn build_raw_json(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let content_length = body.len();
    Response::builder()
        .status(status)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .header("Content-Length", content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(what: &str, error: &impl std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}
