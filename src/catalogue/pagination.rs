//! Page/page-size handling for the list endpoint

use crate::error::ApiError;
use crate::http::QueryParams;

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Read `page` and `pageSize`, defaulting absent or empty values
    ///
    /// Anything that is not a positive integer is rejected.
    pub fn from_query(query: &QueryParams) -> Result<Self, ApiError> {
        Ok(Self {
            page: parse_positive("page", query.get("page"), DEFAULT_PAGE)?,
            page_size: parse_positive("pageSize", query.get("pageSize"), DEFAULT_PAGE_SIZE)?,
        })
    }

    pub const fn start_index(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// The records on this page; empty once past the end
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.start_index().min(items.len());
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }
}

fn parse_positive(name: &str, raw: Option<&str>, default: usize) -> Result<usize, ApiError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(v) => v,
    };
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid pagination parameter '{name}': {raw}"
        ))),
    }
}
