//! Logger module
//!
//! Provides logging utilities for the mock server:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging with a configurable level
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::fallback::RewriteRules;
use std::net::SocketAddr;

/// Log verbosity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
}

impl Level {
    /// Parse a level name; unknown names mean `Info`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            _ => Self::Info,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        Level::parse(&config.logging.level),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_warning(message: &str) {
    match writer::get() {
        Some(w) => w.write_warning(message),
        None => eprintln!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Pokédex mock server is running");
    write_info(&format!("Listening on: http://{addr}/"));
    write_info(&format!("Catalogue: {}", config.data.catalogue_file));
    write_info(&format!("Fallback db: {}", config.data.db_file));
    write_info(&format!("Rewrite rules: {}", config.data.routes_file));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_rewrite_rules(rules: &RewriteRules) {
    if rules.is_empty() {
        write_info("[Startup] No rewrite rules, fallback paths are served as requested");
    } else {
        write_info(&format!("[Startup] Loaded {} rewrite rule(s)", rules.len()));
    }
}

pub fn log_rewrite(rule: &str, from: &str, to: &str) {
    write_info(&format!("[Rewrite] {from} -> {to} (rule {rule})"));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_warning(&format!("[WARN] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_shutdown() {
    write_info("\n[Shutdown] Stopped accepting connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_and_order() {
        assert_eq!(Level::parse("ERROR"), Level::Error);
        assert_eq!(Level::parse("warn"), Level::Warn);
        assert_eq!(Level::parse("warning"), Level::Warn);
        assert_eq!(Level::parse("debug"), Level::Info);
        assert!(Level::Error < Level::Warn);
        assert!(Level::Warn < Level::Info);
    }
}
