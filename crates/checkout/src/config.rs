//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BOOKCART_API_BASE_URL` - Shop backend base URL (default: `http://127.0.0.1:8000/api/`)
//! - `BOOKCART_API_TOKEN` - Session token issued by the backend's login endpoint
//! - `BOOKCART_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: transport default)
//! - `BOOKCART_SUCCESS_REDIRECT_MS` - Delay before leaving the checkout after success (default: 2000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_SUCCESS_REDIRECT_MS: &str = "2000";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Checkout application configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Shop backend API configuration
    pub api: ShopApiConfig,
    /// How long the success message stays up before navigating away
    pub success_redirect_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Shop backend API configuration.
///
/// Implements `Debug` manually to redact the session token.
#[derive(Clone)]
pub struct ShopApiConfig {
    /// Base URL every API path is joined onto (always ends with `/`)
    pub base_url: Url,
    /// Session token sent as `Authorization: Token <token>`
    pub token: Option<SecretString>,
    /// Optional per-request timeout; `None` keeps the transport default
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for ShopApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or if the token fails
    /// validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ShopApiConfig::from_env()?;
        let success_redirect_delay = Duration::from_millis(parse_env(
            "BOOKCART_SUCCESS_REDIRECT_MS",
            &get_env_or_default("BOOKCART_SUCCESS_REDIRECT_MS", DEFAULT_SUCCESS_REDIRECT_MS),
        )?);

        Ok(Self {
            api,
            success_redirect_delay,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ShopApiConfig {
    /// Create a configuration for `base_url` without a token or timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed or has
    /// no host.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("BOOKCART_API_BASE_URL", base_url)?,
            token: None,
            request_timeout: None,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "BOOKCART_API_BASE_URL",
            &get_env_or_default("BOOKCART_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let token = get_optional_env("BOOKCART_API_TOKEN")
            .map(|value| {
                validate_secret_strength(&value, "BOOKCART_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;
        let request_timeout = get_optional_env("BOOKCART_REQUEST_TIMEOUT_SECS")
            .map(|value| parse_env::<u64>("BOOKCART_REQUEST_TIMEOUT_SECS", &value))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            base_url,
            token,
            request_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a value read from `key`.
fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base URL, requiring a host and a trailing slash.
///
/// Without the trailing slash `Url::join` would replace the last path segment
/// (`/api` + `shop/cart/` = `/shop/cart/`).
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "base URL must have a host".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Backend tokens are 40 random hex characters
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued at login."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hex_token_passes() {
        let result = validate_secret_strength(
            "9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b",
            "BOOKCART_API_TOKEN",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err = validate_secret_strength("your-token-here", "BOOKCART_API_TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_token_rejected() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "BOOKCART_API_TOKEN");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("K", "http://localhost:8000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            url.join("shop/cart/").unwrap().as_str(),
            "http://localhost:8000/api/shop/cart/"
        );
    }

    #[test]
    fn test_base_url_invalid() {
        assert!(matches!(
            parse_base_url("K", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("K", "data:text/plain,hello").is_err());
    }

    #[test]
    fn test_parse_env_number() {
        assert_eq!(parse_env::<u64>("K", " 1500 ").unwrap(), 1500);
        assert!(matches!(
            parse_env::<u64>("K", "soon"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let mut config = ShopApiConfig::new("http://localhost:8000/api/").unwrap();
        config.token = Some(SecretString::from("9944b09199c62bcf9418ad846dd0e4bb"));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("9944b091"));
    }
}
