//! JSON document loader
//!
//! One read and one parse per call. Nothing is cached, so a request always
//! sees the file as it is on disk at that moment.

use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

use crate::error::ApiError;

/// Read `path` as UTF-8 text and parse it as JSON into `T`
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ApiError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|source| ApiError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
