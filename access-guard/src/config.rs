//! Configuration module

use std::env;
use std::str::FromStr;

use crate::engine::ledger::DEFAULT_HISTORY_CAPACITY;
use crate::engine::SuspicionParams;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL; in-memory only when unset
    pub database_url: Option<String>,

    /// Server port
    pub port: u16,

    /// JWT secret key shared with the identity provider
    pub jwt_secret: String,

    /// Role claim required on admin routes
    pub admin_role: String,

    /// Environment (development, production)
    pub environment: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Ring-buffer size for per-address location/timestamp history
    pub history_capacity: usize,

    /// Default suspicion thresholds
    pub suspicion: SuspicionParams,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = SuspicionParams::default();

        Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),

            port: parse_var("PORT", 8080),

            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "access-guard-dev-secret-change-in-production".to_string()),

            admin_role: env::var("ADMIN_ROLE").unwrap_or_else(|_| "admin".to_string()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),

            history_capacity: parse_var("HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY),

            suspicion: SuspicionParams {
                recent_window_seconds: parse_var("SUSPICION_WINDOW_SECONDS", defaults.recent_window_seconds),
                location_threshold: parse_var("SUSPICION_LOCATION_THRESHOLD", defaults.location_threshold),
                rapid_count_threshold: parse_var("SUSPICION_RAPID_COUNT", defaults.rapid_count_threshold),
            },
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl Config {
    /// In-memory configuration for router tests
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            port: 0,
            jwt_secret: "test-secret".to_string(),
            admin_role: "admin".to_string(),
            environment: "test".to_string(),
            log_format: "pretty".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            suspicion: SuspicionParams::default(),
        }
    }
}
