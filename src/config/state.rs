// Application state module
// Everything loaded once at startup and shared read-only across requests

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

use super::types::Config;
use crate::fallback::{JsonDb, RewriteRules};

/// Application state
pub struct AppState {
    pub config: Config,
    /// Catalogue path; the file itself is re-read per request
    pub catalogue_path: PathBuf,
    pub rewrite_rules: RewriteRules,
    pub db: JsonDb,
    pub access_log: bool,

    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(config: &Config, rewrite_rules: RewriteRules, db: JsonDb) -> Self {
        Self {
            config: config.clone(),
            catalogue_path: PathBuf::from(&config.data.catalogue_file),
            rewrite_rules,
            db,
            access_log: config.logging.access_log,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.access_log
    }
}
