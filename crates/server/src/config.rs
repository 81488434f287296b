//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TIDEPOOL_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! ## Optional
//! - `TIDEPOOL_HOST` - Bind address (default: 127.0.0.1)
//! - `TIDEPOOL_PORT` - Listen port (default: 3001)
//! - `SHOPIFY_API_VERSION` - Remote API version (default: 2024-01)
//! - `SYNC_PAGE_SIZE` - Records per remote page, 1-250 (default: 50)
//! - `SYNC_MAX_RETRIES` - Retry bound for transient fetch failures (default: 3)
//! - `SYNC_RETRY_BASE_MS` - Base backoff delay in milliseconds (default: 500)
//! - `SYNC_REQUEST_TIMEOUT_SECS` - Per-request ceiling for remote calls (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_API_VERSION: &str = "2024-01";

/// The remote platform caps page size at 250.
const MAX_PAGE_SIZE: u32 = 250;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Remote platform client configuration
    pub shopify: ShopifySettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Tuning knobs for the Shopify REST client.
///
/// Per-tenant credentials live in the tenants table, not here; this is only
/// the shared transport configuration.
#[derive(Debug, Clone)]
pub struct ShopifySettings {
    /// Remote API version segment (e.g., 2024-01)
    pub api_version: String,
    /// Records requested per page (1-250)
    pub page_size: u32,
    /// Bounded retry count for transient fetch failures
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_base: Duration,
    /// Per-request timeout ceiling
    pub request_timeout: Duration,
}

impl Default for ShopifySettings {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            page_size: 50,
            max_retries: 3,
            retry_base: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
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

        let database_url = get_database_url("TIDEPOOL_DATABASE_URL")?;
        let host = parse_with("TIDEPOOL_HOST", &get_env_or_default("TIDEPOOL_HOST", "127.0.0.1"))?;
        let port = parse_with("TIDEPOOL_PORT", &get_env_or_default("TIDEPOOL_PORT", "3001"))?;

        let shopify = ShopifySettings::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            shopify,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifySettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let page_size: u32 = parse_with(
            "SYNC_PAGE_SIZE",
            &get_env_or_default("SYNC_PAGE_SIZE", "50"),
        )?;
        let page_size = validate_page_size(page_size)?;

        let max_retries = parse_with(
            "SYNC_MAX_RETRIES",
            &get_env_or_default("SYNC_MAX_RETRIES", "3"),
        )?;
        let retry_base_ms: u64 = parse_with(
            "SYNC_RETRY_BASE_MS",
            &get_env_or_default("SYNC_RETRY_BASE_MS", "500"),
        )?;
        let request_timeout_secs: u64 = parse_with(
            "SYNC_REQUEST_TIMEOUT_SECS",
            &get_env_or_default("SYNC_REQUEST_TIMEOUT_SECS", "30"),
        )?;

        Ok(Self {
            api_version: get_env_or_default("SHOPIFY_API_VERSION", &defaults.api_version),
            page_size,
            max_retries,
            retry_base: Duration::from_millis(retry_base_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., TIDEPOOL_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw string value, attributing failures to the named variable.
fn parse_with<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate the configured page size against the remote platform's cap.
fn validate_page_size(page_size: u32) -> Result<u32, ConfigError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidEnvVar(
            "SYNC_PAGE_SIZE".to_string(),
            format!("must be between 1 and {MAX_PAGE_SIZE} (got {page_size})"),
        ));
    }
    Ok(page_size)
}
