// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;

/// Which store backend a database URL selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    /// `postgres://` or `postgresql://`
    Postgres,
    /// `sqlite:`
    Sqlite,
}

/// Renzzle server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// Backend selected by `database_url`
    pub database_kind: DatabaseKind,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Connection pool size
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `RENZZLE_DATABASE_URL`: PostgreSQL or SQLite connection string
    ///
    /// Optional (with defaults):
    /// - `RENZZLE_HTTP_PORT`: HTTP port (default: 8080)
    /// - `RENZZLE_DB_MAX_CONNECTIONS`: Pool size (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("RENZZLE_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("RENZZLE_DATABASE_URL"))?;

        let database_kind = if database_url.starts_with("postgres://")
            || database_url.starts_with("postgresql://")
        {
            DatabaseKind::Postgres
        } else if database_url.starts_with("sqlite:") {
            DatabaseKind::Sqlite
        } else {
            return Err(ConfigError::Invalid(
                "RENZZLE_DATABASE_URL",
                "must start with postgres:// or sqlite:",
            ));
        };

        let http_port: u16 = std::env::var("RENZZLE_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("RENZZLE_HTTP_PORT", "must be a valid port number"))?;

        let max_connections: u32 = std::env::var("RENZZLE_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::Invalid(
                "RENZZLE_DB_MAX_CONNECTIONS",
                "must be a positive integer",
            ))?;

        Ok(Self {
            database_url,
            database_kind,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            max_connections,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Sets env vars for a test and restores them on drop
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("RENZZLE_DATABASE_URL", "postgres://localhost/renzzle");
        guard.remove("RENZZLE_HTTP_PORT");
        guard.remove("RENZZLE_DB_MAX_CONNECTIONS");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://localhost/renzzle");
        assert_eq!(config.database_kind, DatabaseKind::Postgres);
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_config_sqlite_with_custom_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("RENZZLE_DATABASE_URL", "sqlite:renzzle.db?mode=rwc");
        guard.set("RENZZLE_HTTP_PORT", "9090");
        guard.set("RENZZLE_DB_MAX_CONNECTIONS", "4");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_kind, DatabaseKind::Sqlite);
        assert_eq!(config.http_addr.port(), 9090);
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_config_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.remove("RENZZLE_DATABASE_URL");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("RENZZLE_DATABASE_URL")));
        assert!(err.to_string().contains("RENZZLE_DATABASE_URL"));
    }

    #[test]
    fn test_config_unknown_scheme() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("RENZZLE_DATABASE_URL", "mysql://localhost/renzzle");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("RENZZLE_DATABASE_URL", _)));
    }

    #[test]
    fn test_config_invalid_port() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("RENZZLE_DATABASE_URL", "postgres://localhost/renzzle");
        guard.set("RENZZLE_HTTP_PORT", "99999");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("RENZZLE_HTTP_PORT", _)));
    }

    #[test]
    fn test_config_zero_connections() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("RENZZLE_DATABASE_URL", "postgres://localhost/renzzle");
        guard.remove("RENZZLE_HTTP_PORT");
        guard.set("RENZZLE_DB_MAX_CONNECTIONS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid("RENZZLE_DB_MAX_CONNECTIONS", _)
        ));
    }

    #[test]
    fn test_config_error_display() {
        let invalid = ConfigError::Invalid("MY_VAR", "must be a number");
        assert_eq!(
            invalid.to_string(),
            "invalid value for MY_VAR: must be a number"
        );
    }
}
