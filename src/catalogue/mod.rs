//! Pokémon catalogue
//!
//! The catalogue document has two sections: `pokemon-list` (declared total
//! plus ordered summary records) and `pokemon-detail` (id -> full record).
//! Each endpoint only looks at its own section, and records are passed
//! through untouched.

mod loader;
mod pagination;

pub use loader::load_json;
pub use pagination::Pagination;

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::error::ApiError;

const LIST_SECTION: &str = "pokemon-list";
const DETAIL_SECTION: &str = "pokemon-detail";

/// One freshly loaded copy of the catalogue file
#[derive(Debug, Clone)]
pub struct Catalogue {
    document: Value,
}

/// Body of a list response
///
/// `totalItems` is whatever the file declares, omitted when the file has none.
#[derive(Debug, Serialize)]
pub struct ListPage<'a> {
    #[serde(rename = "totalItems", skip_serializing_if = "Option::is_none")]
    pub total_items: Option<&'a Value>,
    #[serde(rename = "pokemonSummaryList")]
    pub summaries: &'a [Value],
}

impl Catalogue {
    /// Load a fresh copy from disk
    pub async fn load(path: &Path) -> Result<Self, ApiError> {
        load_json(path).await.map(Self::from_value)
    }

    pub const fn from_value(document: Value) -> Self {
        Self { document }
    }

    /// One page of summaries plus the declared total
    pub fn page(&self, pagination: Pagination) -> Result<ListPage<'_>, ApiError> {
        let section = self.section(LIST_SECTION)?;
        let summaries = section
            .get("pokemonSummaryList")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ApiError::Malformed(format!("'{LIST_SECTION}.pokemonSummaryList' is not an array"))
            })?;

        Ok(ListPage {
            total_items: section.get("totalItems"),
            summaries: pagination.slice(summaries.as_slice()),
        })
    }

    /// Detail record for `id`
    ///
    /// `null`, `false`, `0` and `""` records count as absent.
    pub fn detail(&self, id: &str) -> Result<Option<&Value>, ApiError> {
        let section = self.section(DETAIL_SECTION)?;
        Ok(section.get(id).filter(|record| is_present(record)))
    }

    fn section(&self, name: &str) -> Result<&Value, ApiError> {
        self.document
            .get(name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ApiError::Malformed(format!("missing '{name}' section")))
    }
}

fn is_present(record: &Value) -> bool {
    match record {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
