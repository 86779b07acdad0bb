//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `IDENTITY_MERGE`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use identity_merge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {:?}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod merge;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use merge::MergeConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// in-memory service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Merge behaviour
    #[serde(default)]
    pub merge: MergeConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `IDENTITY_MERGE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `IDENTITY_MERGE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `IDENTITY_MERGE__DATABASE__URL=...` -> `database.url = ...`
    /// - `IDENTITY_MERGE__MERGE__REINDEX_ON_MERGE=false`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("IDENTITY_MERGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.merge.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("IDENTITY_MERGE__DATABASE__URL");
        env::remove_var("IDENTITY_MERGE__SERVER__PORT");
        env::remove_var("IDENTITY_MERGE__SERVER__ENVIRONMENT");
        env::remove_var("IDENTITY_MERGE__MERGE__VOID_REASON_TEMPLATE");
        env::remove_var("IDENTITY_MERGE__MERGE__PUBLISH_EVENTS");
    }

    #[test]
    fn test_load_with_empty_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert!(config.database.url().is_none());
        assert_eq!(config.server.port, 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("IDENTITY_MERGE__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("IDENTITY_MERGE__SERVER__PORT", "3000");
        env::set_var("IDENTITY_MERGE__MERGE__VOID_REASON_TEMPLATE", "Duplicate of {preferred}");
        env::set_var("IDENTITY_MERGE__MERGE__PUBLISH_EVENTS", "false");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.database.url(), Some("postgresql://test@localhost/test"));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.merge.void_reason_template, "Duplicate of {preferred}");
        assert!(!config.merge.publish_events);
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("IDENTITY_MERGE__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_validate_rejects_blank_void_reason() {
        let config = AppConfig {
            merge: MergeConfig {
                void_reason_template: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::BlankVoidReason)));
    }
}
