//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: preflight and body checks,
//! route matching, and the headers every response carries.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::error::ApiError;
use crate::fallback::{self, Lookup};
use crate::handler::pokemon;
use crate::http::{self, QueryParams};
use crate::logger::{self, AccessLogEntry};

const HEALTH_PATH: &str = "/healthz";

/// Request context encapsulating information needed for routing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: QueryParams,
}

/// The two dedicated catalogue endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoute {
    List,
    Detail,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let mut response = dispatch(&parts, body, &state).await;
    apply_common_headers(response.headers_mut(), &state);

    if parts.method == Method::HEAD {
        response = http::strip_body(response);
    }

    if state.access_log_enabled() {
        log_access(&parts, &response, remote_addr, started, &state);
    }
    Ok(response)
}

async fn dispatch<B>(parts: &Parts, body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if parts.method == Method::OPTIONS {
        return http::build_preflight_response(&parts.headers, state.config.http.enable_cors);
    }

    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&parts.headers, max_body_size) {
        return resp;
    }
    if let Err(resp) = check_json_body(&parts.headers, body, max_body_size).await {
        return resp;
    }

    let ctx = RequestContext {
        method: &parts.method,
        path: parts.uri.path(),
        query: QueryParams::parse(parts.uri.query()),
    };
    route_request(&ctx, state).await
}

/// Route request to a catalogue handler, the health probe, or the fallback
pub async fn route_request(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let is_read = matches!(*ctx.method, Method::GET | Method::HEAD);

    if is_read {
        match match_api_route(ctx.path) {
            Some(ApiRoute::List) => return pokemon::list(&state.catalogue_path, &ctx.query).await,
            Some(ApiRoute::Detail) => {
                return pokemon::detail(&state.catalogue_path, &ctx.query).await
            }
            None => {}
        }
        if ctx.path == HEALTH_PATH {
            return http::build_health_response();
        }
    }

    serve_fallback(ctx, state)
}

/// Match `/{requestUId}/pokemon-list` and `/{requestUId}/pokemon-detail`
///
/// The id segment is required but its value is ignored. Matching is
/// case-insensitive and tolerates one trailing slash.
pub fn match_api_route(path: &str) -> Option<ApiRoute> {
    let path = path.strip_prefix('/')?;
    let path = path.strip_suffix('/').unwrap_or(path);
    let (request_uid, endpoint) = path.split_once('/')?;
    if request_uid.is_empty() || endpoint.contains('/') {
        return None;
    }

    if endpoint.eq_ignore_ascii_case("pokemon-list") {
        Some(ApiRoute::List)
    } else if endpoint.eq_ignore_ascii_case("pokemon-detail") {
        Some(ApiRoute::Detail)
    } else {
        None
    }
}

fn serve_fallback(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let result = fallback::resolve(
        &state.rewrite_rules,
        &state.db,
        ctx.method,
        ctx.path,
        &ctx.query,
    );

    match result {
        Ok(Lookup::Found { body, total_count }) => {
            let mut resp = http::json_response(hyper::StatusCode::OK, &body);
            if let Some(total) = total_count {
                let headers = resp.headers_mut();
                headers.insert("X-Total-Count", HeaderValue::from(total));
                headers.insert(
                    "Access-Control-Expose-Headers",
                    HeaderValue::from_static("X-Total-Count"),
                );
            }
            resp
        }
        Ok(Lookup::NotFound) => http::build_empty_404_response(),
        Err(ApiError::MethodNotAllowed(method)) => {
            logger::log_warning(&format!("Method not allowed on {}: {method}", ctx.path));
            http::build_405_response()
        }
        Err(e) => {
            logger::log_error(&format!("Fallback router failed: {e}"));
            http::error_response(&e, "Internal server error")
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response(max_body_size))
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Read the body and reject malformed JSON when it is declared as JSON
async fn check_json_body<B>(
    headers: &HeaderMap,
    body: B,
    max_body_size: u64,
) -> Result<(), Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let is_json = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/json"));
    if !is_json {
        return Ok(());
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeds {max_body_size} bytes"));
            return Err(http::build_413_response(max_body_size));
        }
        Err(e) => {
            let err = ApiError::BadRequest(format!("Failed to read request body: {e}"));
            return Err(http::error_response(&err, ""));
        }
    };

    if bytes.is_empty() {
        return Ok(());
    }
    serde_json::from_slice::<serde_json::Value>(&bytes)
        .map(drop)
        .map_err(|e| {
            let err = ApiError::BadRequest(format!("Invalid JSON body: {e}"));
            http::error_response(&err, "")
        })
}

fn apply_common_headers(headers: &mut HeaderMap, state: &AppState) {
    if state.config.http.enable_cors {
        http::apply_cors_headers(headers);
    }
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        headers.insert("Server", server);
    }
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    remote_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &state.config.logging.access_log_format);
}
