//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHAT_RELAY` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use chat_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Gateway listening on {}", config.server.socket_addr());
//! ```

mod database;
mod delivery;
mod error;
mod redis;
mod server;
mod upstream;

pub use database::DatabaseConfig;
pub use delivery::DeliveryConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};
pub use upstream::UpstreamConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (event streams + broadcast channel)
    pub redis: RedisConfig,

    /// Upstream collaborators (identity, media)
    pub upstream: UpstreamConfig,

    /// Delivery tuning (backlog paging, retries, buffers)
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// - `CHAT_RELAY__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHAT_RELAY__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// A `.env` file is honored in development.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHAT_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.upstream.validate()?;
        self.delivery.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "CHAT_RELAY__DATABASE__URL",
            "postgresql://test@localhost/chat",
        );
        env::set_var("CHAT_RELAY__REDIS__URL", "redis://localhost:6379");
        env::set_var("CHAT_RELAY__UPSTREAM__USER_API_URL", "http://localhost:3001");
        env::set_var("CHAT_RELAY__UPSTREAM__MEDIA_API_URL", "http://localhost:3002");
    }

    fn clear_env() {
        env::remove_var("CHAT_RELAY__DATABASE__URL");
        env::remove_var("CHAT_RELAY__REDIS__URL");
        env::remove_var("CHAT_RELAY__UPSTREAM__USER_API_URL");
        env::remove_var("CHAT_RELAY__UPSTREAM__MEDIA_API_URL");
        env::remove_var("CHAT_RELAY__SERVER__PORT");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://test@localhost/chat");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.delivery.backlog_default_limit, 50);
    }

    #[test]
    fn custom_port_overrides_default() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__PORT", "8080");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().server.port, 8080);
    }
}
