//! Account service configuration.

use std::env;

use common::DatabaseConfig;
use domain::DEFAULT_LANGUAGE;

/// Default Redis pub/sub channel for account events.
pub const DEFAULT_EVENTS_CHANNEL: &str = "account:events";

/// Account service configuration.
#[derive(Debug, Clone)]
pub struct AccountServiceConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Redis URL for event publishing (None = log events only)
    pub redis_url: Option<String>,
    /// Pub/sub channel events are published on
    pub events_channel: String,
    /// Language given to users created without one
    pub default_language: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

impl AccountServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_url = env::var("ACCOUNT_SERVICE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DatabaseConfig::default().url);

        Self {
            database: DatabaseConfig::from_env_with_url(database_url),
            redis_url: env::var("ACCOUNT_SERVICE_REDIS_URL")
                .or_else(|_| env::var("REDIS_URL"))
                .ok()
                .filter(|url| !url.is_empty()),
            events_channel: env::var("ACCOUNT_SERVICE_EVENTS_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_EVENTS_CHANNEL.to_string()),
            default_language: env::var("APP_LOCALE")
                .unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string()),
            host: env::var("ACCOUNT_SERVICE_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("ACCOUNT_SERVICE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(50053),
        }
    }

    /// Override the bind address with command-line values when given.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

impl Default for AccountServiceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            redis_url: None,
            events_channel: DEFAULT_EVENTS_CHANNEL.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
            host: "0.0.0.0".to_string(),
            port: 50053,
        }
    }
}
