// Configuration module entry point
// Loads layered configuration and holds the per-process application state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::StartupError;

// Re-export public types
pub use state::AppState;
pub use types::Config;

/// Environment variable that overrides `server.port`
const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the config file
    /// (optional), `POKEDEX_*` variables (`POKEDEX_SERVER__PORT`), then `PORT`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::build(config_path, std::env::var(PORT_ENV).ok())
    }

    pub(crate) fn build(
        config_path: &str,
        port_override: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("POKEDEX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("data.catalogue_file", "data/pokemon.json")?
            .set_default("data.db_file", "db.json")?
            .set_default("data.routes_file", "routes.json")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "dev")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "pokedex-mock")?
            .set_default("http.enable_cors", true)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_override_option("server.port", port_override)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, StartupError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| StartupError::Address { addr, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MISSING: &str = "/nonexistent/pokedex-config";

    #[test]
    fn test_defaults() {
        let cfg = Config::build(MISSING, None).unwrap();
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.data.catalogue_file, "data/pokemon.json");
        assert_eq!(cfg.data.db_file, "db.json");
        assert_eq!(cfg.data.routes_file, "routes.json");
        assert!(cfg.http.enable_cors);
        assert_eq!(cfg.logging.access_log_format, "dev");
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_port_override() {
        let cfg = Config::build(MISSING, Some("4010".to_string())).unwrap();
        assert_eq!(cfg.server.port, 4010);
    }

    #[test]
    fn test_invalid_port_override_rejected() {
        assert!(Config::build(MISSING, Some("not-a-port".to_string())).is_err());
    }

    #[test]
    fn test_file_values_and_port_priority() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 5000\n\n[data]\ncatalogue_file = \"fixtures/pokemon.json\""
        )
        .unwrap();
        let path = file.path().with_extension("");
        let path = path.to_str().unwrap();

        let cfg = Config::build(path, None).unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.data.catalogue_file, "fixtures/pokemon.json");

        let cfg = Config::build(path, Some("6000".to_string())).unwrap();
        assert_eq!(cfg.server.port, 6000);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::build(MISSING, Some("3333".to_string())).unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 3333);

        let mut bad = cfg;
        bad.server.host = "not a host".to_string();
        assert!(matches!(
            bad.get_socket_addr(),
            Err(StartupError::Address { .. })
        ));
    }

    #[test]
    fn test_shipped_config_parses() {
        let raw = include_str!("../../config.toml");
        let value: toml::Value = toml::from_str(raw).unwrap();
        assert_eq!(value["server"]["port"].as_integer(), Some(3001));

        let cfg = Config::build(concat!(env!("CARGO_MANIFEST_DIR"), "/config"), None).unwrap();
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.data.catalogue_file, "data/pokemon.json");
    }
}
