//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use stockline_db::DbConfig;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// How long a statement waits on a locked database, in seconds
    pub db_busy_timeout_secs: u64,

    /// Allow cross-origin requests from any origin (frontend dev server)
    pub cors_allow_any: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_port: 3000,
            database_path: PathBuf::from("./stockline.db"),
            db_max_connections: 5,
            db_busy_timeout_secs: 5,
            cors_allow_any: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            http_port: parse_var("HTTP_PORT", defaults.http_port)?,

            database_path: env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,

            db_busy_timeout_secs: parse_var("DB_BUSY_TIMEOUT_SECS", defaults.db_busy_timeout_secs)?,

            cors_allow_any: parse_var("CORS_ALLOW_ANY", defaults.cors_allow_any)?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.db_max_connections)
            .busy_timeout(Duration::from_secs(self.db_busy_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
