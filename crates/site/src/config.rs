//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LODGE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `LODGE_HOST` - Bind address (default: 127.0.0.1)
//! - `LODGE_PORT` - Listen port (default: 8080)
//! - `LODGE_BASE_URL` - Public URL (default: <http://localhost:8080>); `https` enables secure cookies
//! - `LODGE_STATIC_DIR` - Static asset directory (default: crates/site/static)
//! - `LODGE_SMTP_HOST` - SMTP relay host (default: localhost)
//! - `LODGE_SMTP_PORT` - SMTP relay port (default: 1025)
//! - `LODGE_SMTP_USERNAME` / `LODGE_SMTP_PASSWORD` - Relay credentials; when set, mail goes over STARTTLS
//! - `LODGE_MAIL_FROM` - Sender address (default: bookings@lodge.local)
//! - `LODGE_OWNER_EMAIL` - Where new-booking notifications go (default: owner@lodge.local)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use lodge_core::Email;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used for cookie security and links in mail
    pub base_url: Url,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Outgoing mail settings
    pub mail: MailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// SMTP relay and addressing.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub from: Email,
    pub owner: Email,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field(
                "smtp_password",
                &self.smtp_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("from", &self.from)
            .field("owner", &self.owner)
            .finish()
    }
}

impl SiteConfig {
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

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = env
            .optional("LODGE_DATABASE_URL")
            // Fallback to generic DATABASE_URL (set by most Postgres hosting)
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("LODGE_DATABASE_URL".to_string()))?;
        let host = env.parsed("LODGE_HOST", "127.0.0.1")?;
        let port = env.parsed("LODGE_PORT", "8080")?;
        let base_url = env.parsed("LODGE_BASE_URL", "http://localhost:8080")?;
        let static_dir = PathBuf::from(env.or_default("LODGE_STATIC_DIR", "crates/site/static"));

        let mail = MailConfig::from_env(&env)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            static_dir,
            mail,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Cookies are only marked `Secure` when served over HTTPS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl MailConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let smtp_username = env.optional("LODGE_SMTP_USERNAME");
        let smtp_password = env.optional("LODGE_SMTP_PASSWORD").map(SecretString::from);
        if smtp_username.is_some() != smtp_password.is_some() {
            return Err(ConfigError::InvalidEnvVar(
                "LODGE_SMTP_PASSWORD".to_string(),
                "LODGE_SMTP_USERNAME and LODGE_SMTP_PASSWORD must be set together".to_string(),
            ));
        }

        Ok(Self {
            smtp_host: env.or_default("LODGE_SMTP_HOST", "localhost"),
            smtp_port: env.parsed("LODGE_SMTP_PORT", "1025")?,
            smtp_username,
            smtp_password,
            from: env.parsed("LODGE_MAIL_FROM", "bookings@lodge.local")?,
            owner: env.parsed("LODGE_OWNER_EMAIL", "owner@lodge.local")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a variable (or its default) parsed into `T`.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
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

    fn load(vars: &[(&str, &str)]) -> Result<SiteConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SiteConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("LODGE_DATABASE_URL", "postgres://localhost/lodge")]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.mail.smtp_host, "localhost");
        assert_eq!(config.mail.smtp_port, 1025);
        assert!(!config.secure_cookies());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fallback/db")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "LODGE_DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("LODGE_DATABASE_URL", "postgres://localhost/lodge"),
            ("LODGE_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "LODGE_PORT"));
    }

    #[test]
    fn test_https_base_url_enables_secure_cookies() {
        let config = load(&[
            ("LODGE_DATABASE_URL", "postgres://localhost/lodge"),
            ("LODGE_BASE_URL", "https://stay.example.com"),
        ])
        .unwrap();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_smtp_credentials_must_be_paired() {
        let err = load(&[
            ("LODGE_DATABASE_URL", "postgres://localhost/lodge"),
            ("LODGE_SMTP_USERNAME", "relay"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_mail_debug_redacts_password() {
        let config = load(&[
            ("LODGE_DATABASE_URL", "postgres://localhost/lodge"),
            ("LODGE_SMTP_USERNAME", "relay"),
            ("LODGE_SMTP_PASSWORD", "hunter2-very-secret"),
        ])
        .unwrap();
        let debug_output = format!("{:?}", config.mail);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2-very-secret"));
    }
}
