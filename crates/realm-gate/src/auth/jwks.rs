//! Key-set fetching and key resolution.
//!
//! The identity provider publishes its signing keys at
//! `<base>/realms/<realm>/protocol/openid-connect/certs`. `HttpKeySetSource`
//! fetches that document fresh on every call; wrap it in
//! [`CachedKeySetSource`](super::cache::CachedKeySetSource) to bound the
//! number of fetches.
//!
//! # Security
//!
//! - Keys are only used for lookup by `kid`; nothing in a fetched key is
//!   trusted beyond that until the token signature verifies under it
//! - Any fetch anomaly (network, status, body) is a `Fetch` error, never an
//!   empty key set
//! - HTTPS should be used in production (enforced by deployment config)

use crate::config::ProviderConfig;
use crate::errors::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// JSON Web Key as published by the provider.
///
/// `n` and `e` are only present for RSA keys; other key types in the set
/// are tolerated but cannot be used by this verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// Key type (must be "RSA" to be usable).
    #[serde(default)]
    pub kty: String,

    /// Algorithm the key is intended for (e.g. "RS256").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key use ("sig" for signing keys, "enc" for encryption keys).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url, unpadded, big-endian).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url, unpadded, big-endian).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// A set of published signing keys, as returned by one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    /// Keys in the order the provider listed them.
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// Create a key set from a list of keys.
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the first key whose `kid` equals the requested identifier.
    ///
    /// Duplicate identifiers are not rejected; the first match wins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if no key matches.
    pub fn resolve(&self, kid: &str) -> Result<&Jwk, AuthError> {
        self.keys.iter().find(|key| key.kid == kid).ok_or_else(|| {
            tracing::debug!(
                target: "gate.auth.jwks",
                kid = %kid,
                key_count = self.keys.len(),
                "Key not found in key set"
            );
            AuthError::KeyNotFound(kid.to_string())
        })
    }
}

/// Source of the provider's current key set.
///
/// Implementations must fail with `AuthError::Fetch` rather than return an
/// empty or partial set when the provider cannot be read.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set.
    async fn fetch(&self) -> Result<Arc<KeySet>, AuthError>;
}

/// Fetches the key set over HTTP on every call.
pub struct HttpKeySetSource {
    /// URL to the realm's certs endpoint.
    certs_url: String,

    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,

    /// Deadline applied to each fetch, independent of the client's own.
    fetch_timeout: Duration,
}

impl HttpKeySetSource {
    /// Create a source for the realm described by `config`.
    pub fn new(config: &ProviderConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self::with_client(config, http_client)
    }

    /// Create a source that fetches through an existing client.
    ///
    /// The configured fetch timeout still bounds every request.
    pub fn with_client(config: &ProviderConfig, http_client: reqwest::Client) -> Self {
        Self {
            certs_url: config.certs_url(),
            http_client,
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// The URL this source fetches from.
    pub fn certs_url(&self) -> &str {
        &self.certs_url
    }

    /// Deadline applied to each fetch.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    #[instrument(skip_all, fields(url = %self.certs_url))]
    async fn fetch(&self) -> Result<Arc<KeySet>, AuthError> {
        tracing::debug!(target: "gate.auth.jwks", "Fetching key set from provider");

        let response = self
            .http_client
            .get(&self.certs_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to fetch key set");
                AuthError::Fetch(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %status,
                "Key-set endpoint returned error"
            );
            return Err(AuthError::Fetch(format!(
                "key-set endpoint returned {}",
                status
            )));
        }

        let key_set: KeySet = response.json().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse key-set response");
            AuthError::Fetch(e.to_string())
        })?;

        tracing::debug!(
            target: "gate.auth.jwks",
            key_count = key_set.len(),
            "Key set fetched"
        );

        Ok(Arc::new(key_set))
    }
}
