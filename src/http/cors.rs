//! Cross-origin headers
//!
//! Every response allows any origin. Preflight requests are answered here
//! without reaching a handler.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue};
use hyper::{Response, StatusCode};

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// Add the allow-origin header to an outgoing response
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
}

/// Build the 204 answer to an `OPTIONS` preflight
///
/// Requested headers are reflected back as allowed.
pub fn build_preflight_response(
    request_headers: &HeaderMap,
    enable_cors: bool,
) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = StatusCode::NO_CONTENT;

    let headers = resp.headers_mut();
    headers.insert("Content-Length", HeaderValue::from_static("0"));
    if !enable_cors {
        headers.insert("Allow", HeaderValue::from_static("GET, HEAD, OPTIONS"));
        return resp;
    }

    apply_cors_headers(headers);
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    if let Some(requested) = request_headers.get("access-control-request-headers") {
        headers.insert("Access-Control-Allow-Headers", requested.clone());
        headers.insert(
            "Vary",
            HeaderValue::from_static("Access-Control-Request-Headers"),
        );
    }
    resp
}
