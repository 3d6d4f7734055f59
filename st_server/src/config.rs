//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use sports_tournament::db::DatabaseConfig;
use sports_tournament::env::parse_env_or;
use sports_tournament::fixture::DEFAULT_DAYS_BETWEEN_ROUNDS;
use sports_tournament::standings::StandingsConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// Default port the server listens on
const DEFAULT_PORT: u16 = 6970;

/// Where tournament data is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process memory, lost on shutdown
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend '{other}', expected 'postgres' or 'memory'"),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Points and fair play weights
    pub standings: StandingsConfig,
    /// Storage backend
    pub storage: StorageBackend,
    /// Days between two knockout rounds
    pub days_between_rounds: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `storage_override` - Optional storage backend override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if `STORAGE_BACKEND` names an unknown backend
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)));

        let mut database = DatabaseConfig::from_env();
        if let Some(database_url) = database_url_override {
            database.database_url = database_url;
        }

        let storage = match storage_override {
            Some(storage) => storage,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => StorageBackend::Postgres,
            },
        };

        Ok(ServerConfig {
            bind,
            database,
            standings: StandingsConfig::from_env(),
            storage,
            days_between_rounds: parse_env_or("ROUND_INTERVAL_DAYS", DEFAULT_DAYS_BETWEEN_ROUNDS),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let standings = &self.standings;

        if standings.win_points <= standings.draw_points {
            return Err(ConfigError::Invalid {
                var: "WIN_POINTS".to_string(),
                reason: format!(
                    "Must be greater than draw points ({})",
                    standings.draw_points
                ),
            });
        }

        if standings.draw_points < standings.loss_points {
            return Err(ConfigError::Invalid {
                var: "DRAW_POINTS".to_string(),
                reason: format!(
                    "Must not be less than loss points ({})",
                    standings.loss_points
                ),
            });
        }

        for (var, weight) in [
            ("YELLOW_CARD_WEIGHT", standings.yellow_card_weight),
            ("BLUE_CARD_WEIGHT", standings.blue_card_weight),
            ("RED_CARD_WEIGHT", standings.red_card_weight),
        ] {
            if weight < 0 {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must not be negative".to_string(),
                });
            }
        }

        if self.days_between_rounds == 0 {
            return Err(ConfigError::Invalid {
                var: "ROUND_INTERVAL_DAYS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.storage == StorageBackend::Postgres && self.database.database_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a PostgreSQL URL or use STORAGE_BACKEND=memory".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
