use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub seed_dir: PathBuf,
    pub bootstrap: bool,
}

impl AppConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_seed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.seed_dir = dir.into();
        self
    }

    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.bootstrap = enabled;
        self
    }

    /// Build configuration from environment variables with fallbacks
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let max_connections = match std::env::var("DB_MAX_CONNECTIONS") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DB_MAX_CONNECTIONS",
                value,
            })?,
            Err(_) => defaults.max_connections,
        };
        let bind_addr = match std::env::var("PROMS_ADDR") {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PROMS_ADDR",
                value,
            })?,
            Err(_) => defaults.bind_addr,
        };
        let seed_dir = std::env::var("PROMS_SEED_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.seed_dir);
        let bootstrap = match std::env::var("PROMS_BOOTSTRAP") {
            Ok(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue {
                key: "PROMS_BOOTSTRAP",
                value,
            })?,
            Err(_) => defaults.bootstrap,
        };

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
            seed_dir,
            bootstrap,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://proms.db".to_string(),
            max_connections: 5,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            seed_dir: PathBuf::from("config"),
            bootstrap: true,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
