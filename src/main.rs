use std::path::Path;
use std::sync::Arc;

mod catalogue;
mod config;
mod error;
mod fallback;
mod handler;
mod http;
mod logger;
mod server;

use error::StartupError;
use fallback::{JsonDb, RewriteRules};

/// Config file path (without extension) used when none is given
const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path).map_err(StartupError::from)?;

    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let rewrite_rules = RewriteRules::load(Path::new(&cfg.data.routes_file)).await?;
    let db = JsonDb::load(Path::new(&cfg.data.db_file)).await?;

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);
    logger::log_rewrite_rules(&rewrite_rules);

    let state = Arc::new(config::AppState::new(&cfg, rewrite_rules, db));

    server::signal::start_signal_handler(Arc::clone(&state.shutdown))?;

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local.run_until(server::run(listener, state)).await;
    Ok(())
}
