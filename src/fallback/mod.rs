//! Fallback router
//!
//! Requests that match no dedicated route are rewritten by the startup rule
//! set and then served read-only from the fallback JSON document.

mod db;
mod rewrite;

pub use db::{JsonDb, Lookup};
pub use rewrite::RewriteRules;

use hyper::Method;

use crate::error::ApiError;
use crate::http::QueryParams;
use crate::logger;

/// Resolve a request against the rewrite rules and the fallback document
pub fn resolve(
    rules: &RewriteRules,
    db: &JsonDb,
    method: &Method,
    path: &str,
    query: &QueryParams,
) -> Result<Lookup, ApiError> {
    if !matches!(*method, Method::GET | Method::HEAD) {
        return Err(ApiError::MethodNotAllowed(method.to_string()));
    }

    let rewritten = rules.apply(path, query);
    if let Some(rule) = &rewritten.rule {
        let target = if rewritten.query.is_empty() {
            rewritten.path.clone()
        } else {
            format!("{}?{}", rewritten.path, rewritten.query.to_query_string())
        };
        logger::log_rewrite(rule, path, &target);
    }
    Ok(db.get(&rewritten.path, &rewritten.query))
}
