//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `REDSEAM_API_URL` - Base URL of the RedSeam REST API
//!   (default: `https://api.redseam.redberryinternship.ge/api`)
//! - `REDSEAM_HTTP_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `REDSEAM_DATA_DIR` - Directory for the session and local storage files (default: `.redseam`)
//! - `REDSEAM_TOKEN_TTL_HOURS` - Lifetime of a stored bearer token (default: 24)
//! - `REDSEAM_DELIVERY_FEE` - Flat delivery fee added to every order (default: 5)
//! - `REDSEAM_DEBOUNCE_MS` - Quantity change coalescing window (default: 300)
//! - `REDSEAM_CHECKOUT_POLICY` - `best-effort` or `strict` (default: `best-effort`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use redseam_core::Price;
use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use crate::cart::CheckoutPolicy;

const DEFAULT_API_URL: &str = "https://api.redseam.redberryinternship.ge/api";
const DEFAULT_DATA_DIR: &str = ".redseam";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_DELIVERY_FEE: &str = "5";
const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote API settings
    pub api: ApiConfig,
    /// Directory holding `session.json` and `local_storage.json`
    pub data_dir: PathBuf,
    /// How long a stored bearer token stays valid
    pub token_ttl: chrono::Duration,
    /// Cart session behavior
    pub cart: CartSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Optional per-request timeout; requests wait indefinitely when unset
    pub timeout: Option<Duration>,
}

/// Cart session behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    /// Flat fee added to the subtotal
    pub delivery_fee: Price,
    /// Trailing-edge window for coalescing quantity changes
    pub debounce: Duration,
    /// What checkout reports when some line items could not be removed
    pub checkout_policy: CheckoutPolicy,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            delivery_fee: Price::new(Decimal::from(5)),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            checkout_policy: CheckoutPolicy::BestEffort,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("Invalid default API URL"),
            timeout: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(&get_env_or_default("REDSEAM_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("REDSEAM_API_URL".to_string(), e))?;
        let timeout = get_optional_env("REDSEAM_HTTP_TIMEOUT_SECS")
            .map(|v| parse_env::<u64>("REDSEAM_HTTP_TIMEOUT_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);

        let data_dir = PathBuf::from(get_env_or_default("REDSEAM_DATA_DIR", DEFAULT_DATA_DIR));
        let token_ttl = parse_token_ttl(&get_env_or_default(
            "REDSEAM_TOKEN_TTL_HOURS",
            &DEFAULT_TOKEN_TTL_HOURS.to_string(),
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("REDSEAM_TOKEN_TTL_HOURS".to_string(), e))?;

        let delivery_fee = parse_delivery_fee(&get_env_or_default(
            "REDSEAM_DELIVERY_FEE",
            DEFAULT_DELIVERY_FEE,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("REDSEAM_DELIVERY_FEE".to_string(), e))?;
        let debounce_ms = get_optional_env("REDSEAM_DEBOUNCE_MS")
            .map(|v| parse_env::<u64>("REDSEAM_DEBOUNCE_MS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        let checkout_policy = get_optional_env("REDSEAM_CHECKOUT_POLICY")
            .map(|v| parse_env::<CheckoutPolicy>("REDSEAM_CHECKOUT_POLICY", &v))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            api: ApiConfig { base_url, timeout },
            data_dir,
            token_ttl,
            cart: CartSettings {
                delivery_fee,
                debounce: Duration::from_millis(debounce_ms),
                checkout_policy,
            },
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Path of the short-lived session tier (bearer token).
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    /// Path of the durable tier (avatar and cart images).
    #[must_use]
    pub fn local_storage_path(&self) -> PathBuf {
        self.data_dir.join("local_storage.json")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable value, naming the variable on failure.
fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base URL, requiring http(s) and dropping a trailing slash.
fn parse_base_url(value: &str) -> Result<Url, String> {
    let trimmed = value.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("URL must have a host".to_string());
    }
    Ok(url)
}

/// Parse a positive token lifetime in hours.
fn parse_token_ttl(value: &str) -> Result<chrono::Duration, String> {
    let hours = value.trim().parse::<i64>().map_err(|e| e.to_string())?;
    if hours < 1 {
        return Err("token lifetime must be at least one hour".to_string());
    }
    chrono::Duration::try_hours(hours).ok_or_else(|| format!("{hours} hours is out of range"))
}

/// Parse a non-negative delivery fee.
fn parse_delivery_fee(value: &str) -> Result<Price, String> {
    let amount = Decimal::from_str(value.trim()).map_err(|e| e.to_string())?;
    if amount.is_sign_negative() {
        return Err("delivery fee cannot be negative".to_string());
    }
    Ok(Price::new(amount))
}
