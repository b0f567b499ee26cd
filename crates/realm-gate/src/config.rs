//! Identity provider configuration.
//!
//! Configuration is loaded once from environment variables and passed to the
//! key-set source at construction. Missing provider settings are a startup
//! failure, not a per-request one.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the provider base URL.
pub const PROVIDER_URL_VAR: &str = "API_APP_KEYCLOAK_INTERNAL_URL";

/// Environment variable holding the realm name.
pub const REALM_VAR: &str = "API_APP_KEYCLOAK_REALM";

/// Default key-set fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Maximum key-set fetch timeout in seconds.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Maximum key-set cache TTL in seconds (1 day).
pub const MAX_CACHE_TTL_SECONDS: u64 = 86_400;

/// Identity provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider base URL without a trailing slash (e.g. "http://keycloak:8080").
    pub base_url: String,

    /// Realm (tenant) whose signing keys are trusted.
    pub realm: String,

    /// Timeout applied to each key-set fetch.
    pub fetch_timeout: Duration,

    /// Key-set cache TTL. `None` fetches on every verification.
    pub cache_ttl: Option<Duration>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid provider URL: {0}")]
    InvalidProviderUrl(String),

    #[error("Invalid realm: {0}")]
    InvalidRealm(String),

    #[error("Invalid key-set fetch timeout: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid key-set cache TTL: {0}")]
    InvalidCacheTtl(String),
}

impl ProviderConfig {
    /// Build a configuration from explicit values with default fetch timeout and no cache.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either value is empty or the URL is not http(s).
    pub fn new(base_url: &str, realm: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            realm: validate_realm(realm)?,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            cache_ttl: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let base_url = required(vars, PROVIDER_URL_VAR)?;
        let realm = required(vars, REALM_VAR)?;

        let mut config = Self::new(base_url, realm)?;

        if let Some(value_str) = optional(vars, "JWKS_FETCH_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_FETCH_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidFetchTimeout(format!(
                    "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                    MAX_FETCH_TIMEOUT_SECONDS, value
                )));
            }

            config.fetch_timeout = Duration::from_secs(value);
        }

        if let Some(value_str) = optional(vars, "JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_CACHE_TTL_SECONDS {
                return Err(ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be between 1 and {}, got {}",
                    MAX_CACHE_TTL_SECONDS, value
                )));
            }

            config.cache_ttl = Some(Duration::from_secs(value));
        }

        tracing::debug!(
            target: "gate.config",
            base_url = %config.base_url,
            realm = %config.realm,
            fetch_timeout_secs = config.fetch_timeout.as_secs(),
            cache_ttl_secs = config.cache_ttl.map(|ttl| ttl.as_secs()),
            "Provider configuration loaded"
        );

        Ok(config)
    }

    /// Enable the key-set cache with the given TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Override the key-set fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// URL of the realm's published signing keys.
    pub fn certs_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/certs",
            self.base_url, self.realm
        )
    }
}

/// Empty values are treated the same as unset ones.
fn optional<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn required<'a>(vars: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn normalize_base_url(base_url: &str) -> Result<String, ConfigError> {
    let trimmed = base_url.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Err(ConfigError::MissingEnvVar(PROVIDER_URL_VAR.to_string()));
    }

    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidProviderUrl(format!(
            "{} must start with http:// or https://, got '{}'",
            PROVIDER_URL_VAR, trimmed
        )));
    }

    Ok(trimmed.to_string())
}

fn validate_realm(realm: &str) -> Result<String, ConfigError> {
    let trimmed = realm.trim();

    if trimmed.is_empty() {
        return Err(ConfigError::MissingEnvVar(REALM_VAR.to_string()));
    }

    if trimmed.contains('/') || trimmed.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidRealm(format!(
            "{} must be a single path segment, got '{}'",
            REALM_VAR, trimmed
        )));
    }

    Ok(trimmed.to_string())
}
