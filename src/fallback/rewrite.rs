//! Path rewrite rules
//!
//! Rules come from a JSON object such as:
//!
//! ```json
//! { "/api/*": "/$1", "/:resource/:id/show": "/:resource/:id" }
//! ```
//!
//! In a pattern, `:name` matches one path segment and `*` matches anything,
//! including slashes. Targets refer to captures by name (`:name`) or by
//! position (`$1`, `$2`, ... counting every capture left to right).
//! Rules are tried in file order and the first match wins.

use regex::{Captures, Regex};
use serde_json::Value;
use std::path::Path;

use crate::catalogue::load_json;
use crate::error::StartupError;
use crate::http::QueryParams;

#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub pattern: String,
    pub target: String,
    matcher: Regex,
}

/// Result of applying the rule set to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenUri {
    pub path: String,
    pub query: QueryParams,
    /// Pattern of the rule that matched, if any
    pub rule: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    rules: Vec<RewriteRule>,
}

impl RewriteRule {
    pub fn new(pattern: &str, target: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: pattern.to_string(),
            target: target.to_string(),
            matcher: Regex::new(&compile_pattern(pattern))?,
        })
    }

    /// Rewritten target (path plus optional query) if `path` matches
    pub fn apply(&self, path: &str) -> Option<String> {
        let caps = self.matcher.captures(path)?;
        Some(self.expand_target(&caps))
    }

    fn expand_target(&self, caps: &Captures<'_>) -> String {
        let mut out = String::with_capacity(self.target.len());
        let mut rest = self.target.as_str();

        while let Some(pos) = rest.find(['$', ':']) {
            out.push_str(&rest[..pos]);
            let marker = rest.as_bytes()[pos];
            let after = &rest[pos + 1..];

            let token_len = if marker == b'$' {
                after.bytes().take_while(u8::is_ascii_digit).count()
            } else {
                after
                    .bytes()
                    .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                    .count()
            };

            if token_len == 0 {
                out.push(char::from(marker));
                rest = after;
                continue;
            }

            let token = &after[..token_len];
            let matched = if marker == b'$' {
                token.parse::<usize>().ok().and_then(|g| caps.get(g))
            } else {
                caps.name(&format!("p_{token}"))
            };

            match matched {
                Some(m) => out.push_str(m.as_str()),
                // Unknown reference stays literal
                None => {
                    out.push(char::from(marker));
                    out.push_str(token);
                }
            }
            rest = &after[token_len..];
        }
        out.push_str(rest);
        out
    }
}

/// Translate a route pattern into an anchored, case-insensitive regex
fn compile_pattern(pattern: &str) -> String {
    let mut source = String::from("(?i)^");
    let mut names = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str("(.*)");
            }
            ':' if chars
                .peek()
                .is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_') =>
            {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Duplicate names keep the first capture
                if names.contains(&name) {
                    source.push_str("([^/]+?)");
                } else {
                    source.push_str(&format!("(?P<p_{name}>[^/]+?)"));
                    names.push(name);
                }
            }
            _ => literal.push(c),
        }
    }
    source.push_str(&regex::escape(literal.trim_end_matches('/')));
    source.push_str("/?$");
    source
}

impl RewriteRules {
    /// Load rules from a JSON object of `"pattern": "target"` pairs
    pub async fn load(path: &Path) -> Result<Self, StartupError> {
        let doc: Value = load_json(path)
            .await
            .map_err(|source| StartupError::Data {
                what: "rewrite rules",
                source,
            })?;
        Self::from_value(&doc)
    }

    pub fn from_value(doc: &Value) -> Result<Self, StartupError> {
        let object = doc.as_object().ok_or(StartupError::InvalidRewriteRules)?;
        let rules = object
            .iter()
            .map(|(pattern, target)| {
                let target = target.as_str().ok_or(StartupError::InvalidRewriteRules)?;
                RewriteRule::new(pattern, target).map_err(|_| StartupError::InvalidRewriteRules)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite `path`, keeping the original query first and appending any
    /// query the target adds. No match leaves the request unchanged.
    pub fn apply(&self, path: &str, query: &QueryParams) -> RewrittenUri {
        let mut rewritten = RewrittenUri {
            path: path.to_string(),
            query: query.clone(),
            rule: None,
        };

        let matched = self
            .rules
            .iter()
            .find_map(|rule| rule.apply(path).map(|target| (rule, target)));
        if let Some((rule, target)) = matched {
            rewritten.rule = Some(rule.pattern.clone());
            match target.split_once('?') {
                Some((target_path, target_query)) => {
                    rewritten.path = target_path.to_string();
                    rewritten.query.merge(QueryParams::parse(Some(target_query)));
                }
                None => rewritten.path = target,
            }
        }
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(doc: Value) -> RewriteRules {
        RewriteRules::from_value(&doc).unwrap()
    }

    #[test]
    fn test_wildcard_positional_capture() {
        let r = rules(json!({ "/api/*": "/$1" }));
        let out = r.apply("/api/pokemon/1", &QueryParams::default());
        assert_eq!(out.path, "/pokemon/1");
        assert_eq!(out.rule.as_deref(), Some("/api/*"));
    }

    #[test]
    fn test_named_params() {
        let r = rules(json!({ "/:resource/:id/show": "/:resource/:id" }));
        assert_eq!(r.apply("/posts/7/show", &QueryParams::default()).path, "/posts/7");
        // Param matches a single segment only
        assert_eq!(r.apply("/a/b/c/show", &QueryParams::default()).path, "/a/b/c/show");
    }

    #[test]
    fn test_target_query_is_merged() {
        let r = rules(json!({ "/trainers/:id/team": "/team?trainerId=:id" }));
        let out = r.apply("/trainers/3/team", &QueryParams::parse(Some("_limit=2")));
        assert_eq!(out.path, "/team");
        assert_eq!(out.query.get("_limit"), Some("2"));
        assert_eq!(out.query.get("trainerId"), Some("3"));
    }

    #[test]
    fn test_first_rule_wins() {
        let r = rules(json!({ "/v1/*": "/first/$1", "/v1/special": "/second" }));
        assert_eq!(r.apply("/v1/special", &QueryParams::default()).path, "/first/special");
    }

    #[test]
    fn test_no_match_keeps_path_and_query() {
        let r = rules(json!({ "/api/*": "/$1" }));
        let query = QueryParams::parse(Some("q=pika"));
        let out = r.apply("/pokemon", &query);
        assert_eq!(
            out,
            RewrittenUri {
                path: "/pokemon".to_string(),
                query,
                rule: None
            }
        );
    }

    #[test]
    fn test_trailing_slash_and_case_insensitive() {
        let r = rules(json!({ "/Legacy/items": "/items" }));
        assert_eq!(r.apply("/legacy/items/", &QueryParams::default()).path, "/items");
    }

    #[test]
    fn test_literal_regex_chars_escaped() {
        let r = rules(json!({ "/file.json": "/db" }));
        assert_eq!(r.apply("/file.json", &QueryParams::default()).path, "/db");
        assert_eq!(r.apply("/fileXjson", &QueryParams::default()).path, "/fileXjson");
    }

    #[test]
    fn test_unknown_reference_stays_literal() {
        let rule = RewriteRule::new("/a/:id", "/b/:other/$9/:id").unwrap();
        assert_eq!(rule.apply("/a/5").unwrap(), "/b/:other/$9/5");
    }

    #[test]
    fn test_invalid_rules_document() {
        assert!(RewriteRules::from_value(&json!(["/a"])).is_err());
        assert!(RewriteRules::from_value(&json!({ "/a": 3 })).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"/api/*": "/$1"}"#).unwrap();
        let r = RewriteRules::load(file.path()).await.unwrap();
        assert_eq!(r.len(), 1);
        assert!(!r.is_empty());
        assert!(RewriteRules::default().is_empty());

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RewriteRules::load(&dir.path().join("routes.json")).await,
            Err(StartupError::Data { .. })
        ));
    }
}
