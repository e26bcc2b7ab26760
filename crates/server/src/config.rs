//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTLINE_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed when `CARTLINE_STORAGE=memory`)
//!
//! ## Optional
//! - `CARTLINE_STORAGE` - `postgres` or `memory` (default: postgres)
//! - `CARTLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `CARTLINE_PORT` - Listen port (default: 9000)
//! - `CARTLINE_BASE_URL` - Public URL, decides secure cookies (default: <http://localhost:9000>)
//! - `CARTLINE_CORS_ORIGINS` - Comma-separated allowed origins
//! - `CARTLINE_CART_TTL_HOURS` - Sliding cart lifetime, 1 to 8784 (default: 24)
//! - `CARTLINE_CART_REAP_INTERVAL_SECS` - Expired cart sweep period, 0 disables (default: 300)
//! - `CARTLINE_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `CARTLINE_RATE_LIMIT` - `on` or `off` for auth endpoints (default: on)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Longest cart lifetime accepted from `CARTLINE_CART_TTL_HOURS` (one year).
const MAX_CART_TTL_HOURS: u32 = 24 * 366;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local maps; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// An `on`/`off` flag.
struct Switch(bool);

impl FromStr for Switch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" | "true" | "1" => Ok(Self(true)),
            "off" | "false" | "0" => Ok(Self(false)),
            other => Err(format!("expected 'on' or 'off', got '{other}'")),
        }
    }
}

/// Server application configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct ServerConfig {
    pub storage: StorageBackend,
    /// `PostgreSQL` connection URL (contains password); `None` for memory storage
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Sliding cart lifetime
    pub cart_ttl: chrono::Duration,
    /// Expired cart sweep period; `None` disables the sweep
    pub cart_reap_interval: Option<Duration>,
    pub log_format: LogFormat,
    /// Per-IP rate limiting on the auth endpoints
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("storage", &self.storage)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("cors_origins", &self.cors_origins)
            .field("cart_ttl", &self.cart_ttl)
            .field("cart_reap_interval", &self.cart_reap_interval)
            .field("log_format", &self.log_format)
            .field("rate_limit", &self.rate_limit)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let storage: StorageBackend = env.parse_or("CARTLINE_STORAGE", "postgres")?;
        let database_url = env
            .get("CARTLINE_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from);
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "CARTLINE_DATABASE_URL".to_string(),
            ));
        }

        let cart_ttl_hours: u32 = env.parse_or("CARTLINE_CART_TTL_HOURS", "24")?;
        if !(1..=MAX_CART_TTL_HOURS).contains(&cart_ttl_hours) {
            return Err(ConfigError::InvalidEnvVar(
                "CARTLINE_CART_TTL_HOURS".to_string(),
                format!("must be between 1 and {MAX_CART_TTL_HOURS}"),
            ));
        }
        let reap_secs: u64 = env.parse_or("CARTLINE_CART_REAP_INTERVAL_SECS", "300")?;

        Ok(Self {
            storage,
            database_url,
            host: env.parse_or("CARTLINE_HOST", "127.0.0.1")?,
            port: env.parse_or("CARTLINE_PORT", "9000")?,
            base_url: env.get_or("CARTLINE_BASE_URL", "http://localhost:9000"),
            cors_origins: env
                .get_or("CARTLINE_CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect(),
            cart_ttl: chrono::Duration::hours(i64::from(cart_ttl_hours)),
            cart_reap_interval: (reap_secs > 0).then(|| Duration::from_secs(reap_secs)),
            log_format: env.parse_or("CARTLINE_LOG_FORMAT", "pretty")?,
            rate_limit: env.parse_or::<Switch>("CARTLINE_RATE_LIMIT", "on")?.0,
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests and local runs on the memory backend.
    #[must_use]
    pub fn for_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost".to_string(),
            cors_origins: Vec::new(),
            cart_ttl: chrono::Duration::hours(24),
            cart_reap_interval: None,
            log_format: LogFormat::Pretty,
            rate_limit: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable; blank counts as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_or(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config = load(&[("CARTLINE_DATABASE_URL", "postgres://localhost/cartline")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.port, 9000);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.cart_ttl, chrono::Duration::hours(24));
        assert_eq!(config.cart_reap_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.rate_limit);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fly/db")]).unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://fly/db"
        );
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::MissingEnvVar(ref key)) if key == "CARTLINE_DATABASE_URL"
        ));
        let config = load(&[("CARTLINE_STORAGE", "memory")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert!(matches!(
            load(&[("CARTLINE_STORAGE", "mongo")]),
            Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "CARTLINE_STORAGE"
        ));
        assert!(matches!(
            load(&[("CARTLINE_STORAGE", "memory"), ("CARTLINE_PORT", "ninety")]),
            Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "CARTLINE_PORT"
        ));
        assert!(matches!(
            load(&[("CARTLINE_STORAGE", "memory"), ("CARTLINE_CART_TTL_HOURS", "0")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_cart_ttl_is_bounded() {
        let ttl = |hours: &str| {
            load(&[
                ("CARTLINE_STORAGE", "memory"),
                ("CARTLINE_CART_TTL_HOURS", hours),
            ])
        };

        assert_eq!(
            ttl("8784").unwrap().cart_ttl,
            chrono::Duration::hours(8784)
        );
        for hours in ["8785", "4000000000"] {
            assert!(matches!(
                ttl(hours),
                Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "CARTLINE_CART_TTL_HOURS"
            ));
        }
    }

    #[test]
    fn test_reaper_can_be_disabled() {
        let config = load(&[
            ("CARTLINE_STORAGE", "memory"),
            ("CARTLINE_CART_REAP_INTERVAL_SECS", "0"),
            ("CARTLINE_BASE_URL", "https://shop.example.com"),
            ("CARTLINE_CORS_ORIGINS", "https://shop.example.com, "),
            ("CARTLINE_RATE_LIMIT", "off"),
        ])
        .unwrap();
        assert!(!config.rate_limit);
        assert_eq!(config.cart_reap_interval, None);
        assert!(config.secure_cookies());
        assert_eq!(config.cors_origins, vec!["https://shop.example.com"]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("CARTLINE_DATABASE_URL", "postgres://u:hunter2@db/x")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
