//! Builder patterns for test token construction
//!
//! Provides a fluent API for creating signed and deliberately broken tokens.

use crate::crypto_fixtures::{FixtureError, TestSigningKey};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{crypto, Algorithm};
use serde_json::{json, Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Builder for creating test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_realm_role("reports:read")
///     .sign_with(&test_signing_key(1)?)?;
/// ```
pub struct TestTokenBuilder {
    kid: Option<String>,
    alg: Option<String>,
    raw_header: Option<String>,
    sub: String,
    roles: Vec<String>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults (RS256, subject "test-subject").
    pub fn new() -> Self {
        Self {
            kid: None,
            alg: Some("RS256".to_string()),
            raw_header: None,
            sub: "test-subject".to_string(),
            roles: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Add a realm role
    pub fn with_realm_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }

    /// Add an arbitrary claim, replacing any default of the same name
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Override the header kid. By default the signing key's kid is used.
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Override the declared header algorithm. The signing algorithm is
    /// chosen separately, see `sign_with_algorithm`.
    pub fn with_alg(mut self, alg: &str) -> Self {
        self.alg = Some(alg.to_string());
        self
    }

    /// Omit `alg` from the header.
    pub fn without_alg(mut self) -> Self {
        self.alg = None;
        self
    }

    /// Use this exact header JSON instead of building one.
    pub fn with_raw_header(mut self, header: &str) -> Self {
        self.raw_header = Some(header.to_string());
        self
    }

    /// Build the claims as a JSON value
    pub fn claims(&self) -> Value {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iat".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + 300));
        claims.insert("realm_access".to_string(), json!({ "roles": self.roles }));
        // Explicit claims override the defaults
        claims.extend(self.extra.clone());
        Value::Object(claims)
    }

    fn header(&self, default_kid: &str) -> String {
        if let Some(raw) = &self.raw_header {
            return raw.clone();
        }

        let mut header = Map::new();
        if let Some(alg) = &self.alg {
            header.insert("alg".to_string(), json!(alg));
        }
        header.insert("typ".to_string(), json!("JWT"));
        header.insert(
            "kid".to_string(),
            json!(self.kid.as_deref().unwrap_or(default_kid)),
        );
        Value::Object(header).to_string()
    }

    /// The `header.payload` part of the token.
    pub fn signing_input(&self, default_kid: &str) -> String {
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(self.header(default_kid)),
            URL_SAFE_NO_PAD.encode(self.claims().to_string())
        )
    }

    /// Sign with RS256 under `key`.
    pub fn sign_with(self, key: &TestSigningKey) -> Result<String, FixtureError> {
        self.sign_with_algorithm(key, Algorithm::RS256)
    }

    /// Sign with `algorithm` under `key`.
    ///
    /// The header's `alg` is whatever the builder declares, so pair this
    /// with `with_alg` for a consistent token.
    pub fn sign_with_algorithm(
        self,
        key: &TestSigningKey,
        algorithm: Algorithm,
    ) -> Result<String, FixtureError> {
        let signing_input = self.signing_input(&key.kid);
        let signature = crypto::sign(signing_input.as_bytes(), &key.encoding_key()?, algorithm)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign test token: {}", e)))?;
        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Attach an arbitrary signature segment instead of signing.
    pub fn with_signature(self, kid: &str, signature: &str) -> String {
        format!("{}.{}", self.signing_input(kid), signature)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
