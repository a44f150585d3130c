//! Error types
//!
//! `ApiError` covers everything a single request can fail with. It never
//! outlives the request: the router turns it into a JSON response and logs
//! the cause. `StartupError` covers bootstrap failures in `main`.

use hyper::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Data file missing or unreadable
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data file is not well-formed JSON
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Data file parsed but lacks the expected shape
    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Io { .. } | Self::Parse { .. } | Self::Malformed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// True for failures the client did not cause
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse { .. } | Self::Malformed(_))
    }
}

/// Failures while bootstrapping the server
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to load {what}: {source}")]
    Data {
        what: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("rewrite rules must be a JSON object of \"pattern\": \"target\" strings")]
    InvalidRewriteRules,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
