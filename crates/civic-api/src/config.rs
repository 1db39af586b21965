//! # Runtime Configuration
//!
//! Read once from the environment by the binary and passed down explicitly.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Default number of allocate-and-insert attempts per filing.
pub const DEFAULT_ALLOCATION_MAX_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Application configuration.
///
/// Custom `Debug` redacts the bearer secret and the database URL, which
/// usually embeds a password.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// PostgreSQL connection string. If `None`, the in-memory store is used.
    pub database_url: Option<String>,
    /// Optional YAML file overriding the built-in document type catalog.
    pub catalog_path: Option<PathBuf>,
    /// Attempts per reference allocation before giving up.
    pub allocation_max_attempts: u32,
    /// Where to expose Prometheus metrics, when set.
    pub metrics_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("catalog_path", &self.catalog_path)
            .field("allocation_max_attempts", &self.allocation_max_attempts)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            database_url: None,
            catalog_path: None,
            allocation_max_attempts: DEFAULT_ALLOCATION_MAX_ATTEMPTS,
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{e}"),
            })?,
            None => defaults.port,
        };

        let allocation_max_attempts = match get("ALLOCATION_MAX_ATTEMPTS") {
            Some(raw) => {
                let n: u32 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    var: "ALLOCATION_MAX_ATTEMPTS",
                    reason: format!("{e}"),
                })?;
                if n == 0 {
                    return Err(ConfigError::Invalid {
                        var: "ALLOCATION_MAX_ATTEMPTS",
                        reason: "must be at least 1".into(),
                    });
                }
                n
            }
            None => defaults.allocation_max_attempts,
        };

        let metrics_addr = get("METRICS_ADDR")
            .map(|raw| {
                raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    var: "METRICS_ADDR",
                    reason: format!("{e}"),
                })
            })
            .transpose()?;

        Ok(Self {
            port,
            auth_token: get("AUTH_TOKEN"),
            database_url: get("DATABASE_URL"),
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            allocation_max_attempts,
            metrics_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
        assert!(config.database_url.is_none());
        assert_eq!(config.allocation_max_attempts, 3);
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("AUTH_TOKEN", "s3cret"),
            ("DATABASE_URL", "postgres://u:p@localhost/civic"),
            ("CATALOG_PATH", "/etc/civic/catalog.yaml"),
            ("ALLOCATION_MAX_ATTEMPTS", "5"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(config.allocation_max_attempts, 5);
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/civic/catalog.yaml"))
        );
        assert_eq!(config.metrics_addr.unwrap().port(), 9100);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = AppConfig::from_lookup(lookup(&[("AUTH_TOKEN", "  ")])).unwrap();
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn rejects_bad_port() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!(AppConfig::from_lookup(lookup(&[("ALLOCATION_MAX_ATTEMPTS", "0")])).is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            auth_token: Some("super-secret".into()),
            database_url: Some("postgres://admin:hunter2@db/civic".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
