//! Access log format module
//!
//! Supports three formats:
//! - `dev` (short, one line per request, the default)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)

use chrono::{DateTime, Local};
use serde::Serialize;

/// Access log entry for one request/response pair
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    pub status: u16,
    pub body_bytes: usize,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            status: 200,
            body_bytes: 0,
            request_time_us: 0,
        }
    }

    /// Format the log entry; unknown format names fall back to `dev`
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "json" => self.format_json(),
            _ => self.format_dev(),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// `GET /1/pokemon-list?page=2 200 0.412 ms - 1234`
    fn format_dev(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let elapsed_ms = self.request_time_us as f64 / 1000.0;
        format!(
            "{} {} {} {elapsed_ms:.3} ms - {}",
            self.method,
            self.request_uri(),
            self.status,
            self.body_bytes,
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/1.1\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.request_uri(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"log_error":"{e}"}}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "/abc/pokemon-list".to_string(),
        );
        entry.query = Some("page=2&pageSize=5".to_string());
        entry.status = 200;
        entry.body_bytes = 512;
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_format_dev() {
        let log = create_test_entry().format("dev");
        assert_eq!(
            log,
            "GET /abc/pokemon-list?page=2&pageSize=5 200 1.500 ms - 512"
        );
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.starts_with("127.0.0.1 - - ["));
        assert!(log.contains("\"GET /abc/pokemon-list?page=2&pageSize=5 HTTP/1.1\" 200 512"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["path"], "/abc/pokemon-list");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 512);
    }

    #[test]
    fn test_unknown_format_falls_back_to_dev() {
        let entry = create_test_entry();
        assert_eq!(entry.format("nonsense"), entry.format("dev"));
    }
}
