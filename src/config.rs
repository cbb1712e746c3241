// Runtime configuration
//
// `ev-registry.toml` in the working directory, every key optional. A missing
// file means defaults. EV_REGISTRY_DATABASE / EV_REGISTRY_BIND override the
// file.

use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::telemetry::DEFAULT_QUERY_LOG_CAPACITY;

pub const CONFIG_FILE: &str = "ev-registry.toml";
pub const DATABASE_ENV: &str = "EV_REGISTRY_DATABASE";
pub const BIND_ENV: &str = "EV_REGISTRY_BIND";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("ev_registry.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub query_log_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            query_log_capacity: DEFAULT_QUERY_LOG_CAPACITY,
        }
    }
}

impl Config {
    /// `ev-registry.toml` from the working directory plus environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DATABASE_ENV) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind_address = bind;
        }
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server.bind_address.parse().map_err(|e| {
            Error::Config(format!("Invalid bind address '{}': {}", self.server.bind_address, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.database.path, PathBuf::from("ev_registry.db"));
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.telemetry.query_log_capacity, 10);
        assert_eq!(config.bind_address().unwrap().port(), 3000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [database]
            path = "/var/lib/ev/registry.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/var/lib/ev/registry.db"));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml_str(
            r#"
            [database]
            path = "cars.db"

            [server]
            bind_address = "127.0.0.1:8080"

            [telemetry]
            query_log_capacity = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.telemetry.query_log_capacity, 25);
        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml_str("[server\nbind_address = 1");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "not an address".to_string();

        assert!(matches!(config.bind_address(), Err(Error::Config(_))));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut config = Config::from_toml_str("[server]\nbind_address = \"127.0.0.1:1\"").unwrap();

        config.apply_overrides(|key| match key {
            DATABASE_ENV => Some("override.db".to_string()),
            BIND_ENV => Some("127.0.0.1:9999".to_string()),
            _ => None,
        });

        assert_eq!(config.database.path, PathBuf::from("override.db"));
        assert_eq!(config.server.bind_address, "127.0.0.1:9999");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config::from_file(&dir.path().join(CONFIG_FILE)).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[telemetry]\nquery_log_capacity = 3").unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.telemetry.query_log_capacity, 3);
    }
}
