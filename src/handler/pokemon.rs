//! Pokémon list and detail endpoints
//!
//! Both re-read the catalogue on every call. Load failures become a generic
//! 500 for the client; the real cause goes to the error log.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::path::Path;

use crate::catalogue::{Catalogue, Pagination};
use crate::error::ApiError;
use crate::http::{self, QueryParams};
use crate::logger;

const LIST_ERROR: &str = "Error loading Pokémon list";
const DETAIL_ERROR: &str = "Error loading Pokémon detail";
const NOT_FOUND: &str = "Pokémon not found";

/// `GET /{requestUId}/pokemon-list?page=&pageSize=`
pub async fn list(catalogue_path: &Path, query: &QueryParams) -> Response<Full<Bytes>> {
    match list_page(catalogue_path, query).await {
        Ok(resp) => resp,
        Err(e) => failure(&e, LIST_ERROR),
    }
}

/// `GET /{requestUId}/pokemon-detail?pokemonId=`
pub async fn detail(catalogue_path: &Path, query: &QueryParams) -> Response<Full<Bytes>> {
    match detail_record(catalogue_path, query).await {
        Ok(resp) => resp,
        Err(e) => failure(&e, DETAIL_ERROR),
    }
}

async fn list_page(
    catalogue_path: &Path,
    query: &QueryParams,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let pagination = Pagination::from_query(query)?;
    let catalogue = Catalogue::load(catalogue_path).await?;
    Ok(http::json_response(StatusCode::OK, &catalogue.page(pagination)?))
}

async fn detail_record(
    catalogue_path: &Path,
    query: &QueryParams,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let catalogue = Catalogue::load(catalogue_path).await?;
    let Some(id) = query.get("pokemonId").filter(|id| !id.is_empty()) else {
        return Err(not_found());
    };
    let record = catalogue.detail(id)?.ok_or_else(not_found)?;
    Ok(http::json_response(StatusCode::OK, record))
}

fn not_found() -> ApiError {
    ApiError::NotFound(NOT_FOUND.to_string())
}

fn failure(err: &ApiError, server_message: &str) -> Response<Full<Bytes>> {
    if err.is_server_error() {
        logger::log_error(&format!("{server_message}: {err}"));
    }
    http::error_response(err, server_message)
}
