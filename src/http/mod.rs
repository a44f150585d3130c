//! HTTP protocol layer module
//!
//! Response builders, CORS handling and query string parsing, kept apart
//! from the catalogue and fallback logic.

pub mod cors;
pub mod query;
pub mod response;

// Re-export commonly used types
pub use cors::{apply_cors_headers, build_preflight_response};
pub use query::QueryParams;
pub use response::{
    build_405_response, build_413_response, build_empty_404_response, build_health_response,
    error_response, json_response, strip_body,
};
