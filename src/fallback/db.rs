//! Read-only REST view over a JSON document
//!
//! Each top-level key of the document is a resource. Array resources support
//! lookup by `id`, field filters, full-text search, sorting and paging;
//! object resources are returned whole.
//!
//! | Request | Result |
//! |---------|--------|
//! | `GET /` | resource index |
//! | `GET /db` | whole document |
//! | `GET /:resource` | resource, filtered when it is an array |
//! | `GET /:resource/:id` | array element with matching `id` |
//! | `GET /:parent/:id/:child` | `child` elements whose `<parent>Id` is `id` |

use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::path::Path;

use crate::catalogue::load_json;
use crate::error::StartupError;
use crate::http::QueryParams;

/// Default page size when `_page` is given without `_limit`
const DEFAULT_LIMIT: usize = 10;

/// Query keys that control the listing rather than filter it
const RESERVED_KEYS: &[&str] = &[
    "_sort", "_order", "_start", "_end", "_limit", "_page", "_embed", "_expand", "q",
];

#[derive(Debug, Clone)]
pub struct JsonDb {
    document: Value,
}

/// Outcome of a fallback lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found {
        body: Value,
        /// Filtered count before slicing, sent as `X-Total-Count`
        total_count: Option<usize>,
    },
    NotFound,
}

impl Lookup {
    const fn found(body: Value) -> Self {
        Self::Found {
            body,
            total_count: None,
        }
    }
}

impl JsonDb {
    /// Load the document once; it is held for the life of the process
    pub async fn load(path: &Path) -> Result<Self, StartupError> {
        let document = load_json(path)
            .await
            .map_err(|source| StartupError::Data {
                what: "fallback database",
                source,
            })?;
        Ok(Self::from_value(document))
    }

    pub const fn from_value(document: Value) -> Self {
        Self { document }
    }

    pub fn resource_names(&self) -> Vec<&str> {
        self.document
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, path: &str, query: &QueryParams) -> Lookup {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Lookup::found(json!({ "resources": self.resource_names() })),
            ["db"] => Lookup::found(self.document.clone()),
            [name] => match self.document.get(*name) {
                Some(Value::Array(items)) => list(items.iter(), query),
                Some(other) => Lookup::found(other.clone()),
                None => Lookup::NotFound,
            },
            [name, id] => match self.document.get(*name) {
                Some(Value::Array(items)) => items
                    .iter()
                    .find(|item| item.get("id").is_some_and(|v| value_as_text(v) == *id))
                    .map_or(Lookup::NotFound, |item| Lookup::found(item.clone())),
                _ => Lookup::NotFound,
            },
            [parent, id, child] => {
                if self.document.get(*parent).is_none() {
                    return Lookup::NotFound;
                }
                let Some(Value::Array(items)) = self.document.get(*child) else {
                    return Lookup::NotFound;
                };
                let foreign_key = format!("{}Id", singular(parent));
                let related = items.iter().filter(|item| {
                    item.get(&foreign_key)
                        .is_some_and(|v| value_as_text(v) == *id)
                });
                list(related, query)
            }
            _ => Lookup::NotFound,
        }
    }
}

/// Apply search, filters, sorting and slicing to an array resource
fn list<'a>(items: impl Iterator<Item = &'a Value>, query: &QueryParams) -> Lookup {
    let filters = FieldFilter::from_query(query);
    let needle = query.get("q").map(str::to_lowercase);

    let mut matched: Vec<&Value> = items
        .filter(|item| needle.as_deref().map_or(true, |q| contains_text(item, q)))
        .filter(|item| filters.iter().all(|f| f.matches(item)))
        .collect();

    if let Some(sort) = query.get("_sort") {
        sort_items(&mut matched, sort, query.get("_order").unwrap_or("asc"));
    }

    let total = matched.len();
    let Some((start, end)) = slice_bounds(query, total) else {
        return Lookup::found(Value::Array(matched.into_iter().cloned().collect()));
    };

    let page = matched[start..end].iter().map(|v| (*v).clone()).collect();
    Lookup::Found {
        body: Value::Array(page),
        total_count: Some(total),
    }
}

/// `[start, end)` when any paging key is present
fn slice_bounds(query: &QueryParams, total: usize) -> Option<(usize, usize)> {
    let number = |key: &str| query.get(key).and_then(|v| v.trim().parse::<usize>().ok());
    let limit = number("_limit");

    let (start, end) = if query.get("_page").is_some() {
        let page = number("_page").filter(|p| *p > 0).unwrap_or(1);
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);
        let start = (page - 1).saturating_mul(limit);
        (start, start.saturating_add(limit))
    } else if query.get("_start").is_some() || query.get("_end").is_some() || limit.is_some() {
        let start = number("_start").unwrap_or(0);
        let end = number("_end")
            .or_else(|| limit.map(|l| start.saturating_add(l)))
            .unwrap_or(total);
        (start, end)
    } else {
        return None;
    };

    let start = start.min(total);
    Some((start, end.clamp(start, total)))
}

fn sort_items(items: &mut [&Value], sort: &str, order: &str) {
    let fields: Vec<&str> = sort.split(',').map(str::trim).collect();
    let orders: Vec<&str> = order.split(',').map(str::trim).collect();

    items.sort_by(|a, b| {
        for (i, field) in fields.iter().enumerate() {
            let descending = orders
                .get(i)
                .or_else(|| orders.last())
                .is_some_and(|o| o.eq_ignore_ascii_case("desc"));
            let ord = compare_fields(lookup(a, field), lookup(b, field));
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Missing values sort after present ones
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => value_as_text(x).cmp(&value_as_text(y)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Ne,
    Gte,
    Lte,
    Like,
}

/// All values given for one `field[_op]` query key
#[derive(Debug)]
struct FieldFilter {
    field: String,
    op: FilterOp,
    values: Vec<String>,
    patterns: Vec<Regex>,
}

impl FieldFilter {
    fn from_query(query: &QueryParams) -> Vec<Self> {
        let mut filters: Vec<Self> = Vec::new();

        for (key, value) in query.iter() {
            if RESERVED_KEYS.contains(&key) || key.starts_with('_') {
                continue;
            }
            let (field, op) = split_operator(key);

            let idx = match filters.iter().position(|f| f.field == field && f.op == op) {
                Some(idx) => idx,
                None => {
                    filters.push(Self {
                        field: field.to_string(),
                        op,
                        values: Vec::new(),
                        patterns: Vec::new(),
                    });
                    filters.len() - 1
                }
            };

            let filter = &mut filters[idx];
            if op == FilterOp::Like {
                // Invalid patterns fall back to a literal match
                let pattern = RegexBuilder::new(value)
                    .case_insensitive(true)
                    .build()
                    .or_else(|_| {
                        RegexBuilder::new(&regex::escape(value))
                            .case_insensitive(true)
                            .build()
                    });
                if let Ok(pattern) = pattern {
                    filter.patterns.push(pattern);
                }
            }
            filter.values.push(value.to_string());
        }
        filters
    }

    fn matches(&self, item: &Value) -> bool {
        let found = lookup(item, &self.field);
        match self.op {
            FilterOp::Eq => found.is_some_and(|v| self.values.iter().any(|q| value_as_text(v) == *q)),
            FilterOp::Ne => found.map_or(true, |v| self.values.iter().all(|q| value_as_text(v) != *q)),
            FilterOp::Gte => found.is_some_and(|v| {
                self.values
                    .iter()
                    .any(|q| compare_to_query(v, q) != Ordering::Less)
            }),
            FilterOp::Lte => found.is_some_and(|v| {
                self.values
                    .iter()
                    .any(|q| compare_to_query(v, q) != Ordering::Greater)
            }),
            FilterOp::Like => found.is_some_and(|v| {
                let text = value_as_text(v);
                self.patterns.iter().any(|p| p.is_match(&text))
            }),
        }
    }
}

fn split_operator(key: &str) -> (&str, FilterOp) {
    for (suffix, op) in [
        ("_gte", FilterOp::Gte),
        ("_lte", FilterOp::Lte),
        ("_ne", FilterOp::Ne),
        ("_like", FilterOp::Like),
    ] {
        if let Some(field) = key.strip_suffix(suffix) {
            if !field.is_empty() {
                return (field, op);
            }
        }
    }
    (key, FilterOp::Eq)
}

/// Numeric comparison when both sides are numbers, text otherwise
fn compare_to_query(value: &Value, query: &str) -> Ordering {
    match (value.as_f64(), query.trim().parse::<f64>()) {
        (Some(v), Ok(q)) => v.partial_cmp(&q).unwrap_or(Ordering::Equal),
        _ => value_as_text(value).as_str().cmp(query),
    }
}

/// Resolve a dotted path such as `stats.attack` or `types.0`
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Query-string form of a value: strings bare, everything else as JSON
fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Case-insensitive search over every scalar in `value`; `needle` is lowercase
fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::Object(map) => map.values().any(|v| contains_text(v, needle)),
        Value::Array(items) => items.iter().any(|v| contains_text(v, needle)),
        Value::Null => false,
        other => value_as_text(other).to_lowercase().contains(needle),
    }
}

fn singular(name: &str) -> &str {
    name.strip_suffix('s').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> JsonDb {
        JsonDb::from_value(json!({
            "trainers": [
                { "id": 1, "name": "Ash", "region": "kanto", "badges": 8 },
                { "id": 2, "name": "Misty", "region": "kanto", "badges": 2 },
                { "id": 3, "name": "Brock", "region": "kanto", "badges": 3 },
                { "id": 4, "name": "Dawn", "region": "sinnoh", "badges": 5, "rival": { "name": "Zoey" } }
            ],
            "teams": [
                { "id": 10, "trainerId": 1, "pokemon": "pikachu" },
                { "id": 11, "trainerId": 1, "pokemon": "charizard" },
                { "id": 12, "trainerId": 2, "pokemon": "staryu" }
            ],
            "profile": { "name": "mock" }
        }))
    }

    fn get(path: &str, query: &str) -> Lookup {
        db().get(path, &QueryParams::parse(Some(query)))
    }

    fn body(lookup: Lookup) -> Value {
        match lookup {
            Lookup::Found { body, .. } => body,
            Lookup::NotFound => panic!("expected a body"),
        }
    }

    fn ids(lookup: Lookup) -> Vec<i64> {
        body(lookup)
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_index_and_db() {
        assert_eq!(
            body(get("/", "")),
            json!({ "resources": ["trainers", "teams", "profile"] })
        );
        assert_eq!(body(get("/db", "")), db().document);
    }

    #[test]
    fn test_collection_and_singular() {
        assert_eq!(ids(get("/trainers", "")), vec![1, 2, 3, 4]);
        assert_eq!(body(get("/profile", "")), json!({ "name": "mock" }));
        assert_eq!(get("/unknown", ""), Lookup::NotFound);
    }

    #[test]
    fn test_item_by_id() {
        assert_eq!(body(get("/trainers/2", ""))["name"], "Misty");
        assert_eq!(get("/trainers/99", ""), Lookup::NotFound);
        assert_eq!(get("/profile/1", ""), Lookup::NotFound);
    }

    #[test]
    fn test_equality_filters() {
        assert_eq!(ids(get("/trainers", "region=kanto&badges=8")), vec![1]);
        // Repeated key means any of the values
        assert_eq!(ids(get("/trainers", "name=Ash&name=Dawn")), vec![1, 4]);
        assert_eq!(ids(get("/trainers", "rival.name=Zoey")), vec![4]);
    }

    #[test]
    fn test_operator_filters() {
        assert_eq!(ids(get("/trainers", "badges_gte=3")), vec![1, 3, 4]);
        assert_eq!(ids(get("/trainers", "badges_lte=3")), vec![2, 3]);
        assert_eq!(ids(get("/trainers", "region_ne=kanto")), vec![4]);
        assert_eq!(ids(get("/trainers", "name_like=^b")), vec![3]);
    }

    #[test]
    fn test_full_text_search() {
        assert_eq!(ids(get("/trainers", "q=SINN")), vec![4]);
        assert_eq!(ids(get("/trainers", "q=zoey")), vec![4]);
    }

    #[test]
    fn test_sorting() {
        assert_eq!(ids(get("/trainers", "_sort=badges")), vec![2, 3, 4, 1]);
        assert_eq!(ids(get("/trainers", "_sort=badges&_order=desc")), vec![1, 4, 3, 2]);
        assert_eq!(
            ids(get("/trainers", "_sort=region,name&_order=asc,desc")),
            vec![2, 3, 1, 4]
        );
    }

    #[test]
    fn test_paging_sets_total_count() {
        let lookup = get("/trainers", "_page=2&_limit=3");
        assert_eq!(
            lookup,
            Lookup::Found {
                body: json!([{ "id": 4, "name": "Dawn", "region": "sinnoh", "badges": 5, "rival": { "name": "Zoey" } }]),
                total_count: Some(4),
            }
        );
        assert_eq!(ids(get("/trainers", "_page=9")), Vec::<i64>::new());
    }

    #[test]
    fn test_start_end_limit() {
        assert_eq!(ids(get("/trainers", "_start=1&_end=3")), vec![2, 3]);
        assert_eq!(ids(get("/trainers", "_start=1&_limit=2")), vec![2, 3]);
        assert_eq!(ids(get("/trainers", "_limit=1")), vec![1]);
        assert_eq!(ids(get("/trainers", "_start=3&_end=1")), Vec::<i64>::new());
    }

    #[test]
    fn test_unpaged_has_no_total_count() {
        assert!(matches!(
            get("/trainers", "region=kanto"),
            Lookup::Found { total_count: None, .. }
        ));
    }

    #[test]
    fn test_nested_children() {
        assert_eq!(ids(get("/trainers/1/teams", "")), vec![10, 11]);
        assert_eq!(ids(get("/trainers/1/teams", "pokemon=pikachu")), vec![10]);
        assert_eq!(ids(get("/trainers/3/teams", "")), Vec::<i64>::new());
        assert_eq!(get("/trainers/1/unknown", ""), Lookup::NotFound);
    }

    #[test]
    fn test_too_deep_is_not_found() {
        assert_eq!(get("/a/b/c/d", ""), Lookup::NotFound);
    }
}
