//! Bearer token verification.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The declared algorithm must be an RSA algorithm; this is checked before
//!   any key is fetched, so `none` and HMAC tokens are rejected even when a
//!   matching key exists
//! - A key's own `alg` and `use`, when published, must agree with the token
//! - The signature is checked over the exact received `header.payload` bytes
//! - The payload is not decoded until the signature verifies
//! - Nothing is retried within one verification

use crate::auth::cache::CachedKeySetSource;
use crate::auth::claims::{AcceptAllClaims, Claims, ClaimsValidator};
use crate::auth::jwks::{HttpKeySetSource, Jwk, KeySetSource};
use crate::auth::key::materialize;
use crate::auth::signature::{verify_signature, SigningAlgorithm};
use crate::auth::token::parse_token;
use crate::config::ProviderConfig;
use crate::errors::AuthError;
use common::jwt::decode_segment;
use std::sync::Arc;
use tracing::instrument;

/// Verifies bearer tokens against a provider's published signing keys.
pub struct TokenVerifier {
    /// Where signing keys come from.
    key_source: Arc<dyn KeySetSource>,

    /// Claim-level checks applied after the signature verifies.
    claims_validator: Arc<dyn ClaimsValidator>,
}

impl TokenVerifier {
    /// Create a verifier over an arbitrary key source, accepting all claims.
    pub fn new(key_source: Arc<dyn KeySetSource>) -> Self {
        Self {
            key_source,
            claims_validator: Arc::new(AcceptAllClaims),
        }
    }

    /// Create a verifier that fetches keys over HTTP for the configured realm.
    ///
    /// The key set is cached when `config.cache_ttl` is set, otherwise it is
    /// fetched on every call to [`verify`](Self::verify).
    pub fn from_config(config: &ProviderConfig) -> Self {
        let http = HttpKeySetSource::new(config);

        let key_source: Arc<dyn KeySetSource> = match config.cache_ttl {
            Some(ttl) => {
                tracing::info!(
                    target: "gate.auth.verifier",
                    certs_url = %http.certs_url(),
                    ttl_seconds = ttl.as_secs(),
                    "Token verifier using cached key set"
                );
                Arc::new(CachedKeySetSource::new(http, ttl))
            }
            None => {
                tracing::info!(
                    target: "gate.auth.verifier",
                    certs_url = %http.certs_url(),
                    "Token verifier fetching key set per request"
                );
                Arc::new(http)
            }
        };

        Self::new(key_source)
    }

    /// Replace the claims validator.
    pub fn with_claims_validator(mut self, validator: Arc<dyn ClaimsValidator>) -> Self {
        self.claims_validator = validator;
        self
    }

    /// Verify a raw token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` kind of the first check that fails:
    /// size and structure, header, algorithm, key-set fetch, key lookup,
    /// key usability, signature, then claims.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let parsed = parse_token(token).inspect_err(|e| {
            tracing::debug!(target: "gate.auth.verifier", kind = e.kind(), error = %e, "Token parsing failed");
        })?;

        let alg = SigningAlgorithm::from_header(parsed.header().alg.as_deref()).inspect_err(|e| {
            tracing::debug!(target: "gate.auth.verifier", error = %e, "Token algorithm rejected");
        })?;

        let signature = parsed.signature_segment().ok_or_else(|| {
            tracing::debug!(
                target: "gate.auth.verifier",
                segments = parsed.segment_count(),
                "Token is not a three-segment compact token"
            );
            AuthError::Structural(format!(
                "token has {} segment(s), expected 3",
                parsed.segment_count()
            ))
        })?;

        let kid = parsed.kid().ok_or_else(|| {
            tracing::debug!(target: "gate.auth.verifier", "Token header has no kid");
            AuthError::KeyNotFound(String::new())
        })?;

        let key_set = self.key_source.fetch().await?;
        let jwk = key_set.resolve(kid)?;

        check_key_usable(jwk, alg)?;
        let public_key = materialize(jwk)?;

        verify_signature(parsed.signing_input(), signature, &public_key, alg)?;

        let claims = decode_claims(parsed.payload_segment())?;

        self.claims_validator.validate(&claims).inspect_err(|e| {
            tracing::debug!(target: "gate.auth.verifier", error = %e, "Claims rejected");
        })?;

        tracing::debug!(target: "gate.auth.verifier", kid = %kid, alg = %alg, "Token verified");
        Ok(claims)
    }
}

/// Check that a resolved key may verify a token signed with `alg`.
fn check_key_usable(jwk: &Jwk, alg: SigningAlgorithm) -> Result<(), AuthError> {
    if jwk.kty != "RSA" {
        tracing::warn!(target: "gate.auth.verifier", kid = %jwk.kid, kty = %jwk.kty, "Unexpected JWK key type");
        return Err(AuthError::KeyFormat(format!("key type '{}' is not RSA", jwk.kty)));
    }

    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            tracing::warn!(target: "gate.auth.verifier", kid = %jwk.kid, key_use = %key_use, "JWK is not a signing key");
            return Err(AuthError::KeyFormat(format!("key use '{}' is not sig", key_use)));
        }
    }

    if let Some(key_alg) = &jwk.alg {
        if key_alg != alg.as_str() {
            tracing::warn!(
                target: "gate.auth.verifier",
                kid = %jwk.kid,
                key_alg = %key_alg,
                token_alg = %alg,
                "Token algorithm does not match JWK algorithm"
            );
            return Err(AuthError::AlgorithmMismatch(format!(
                "token declares {} but key is bound to {}",
                alg, key_alg
            )));
        }
    }

    Ok(())
}

/// Decode the verified payload segment into claims.
fn decode_claims(payload_segment: &str) -> Result<Claims, AuthError> {
    let bytes = decode_segment(payload_segment).map_err(|e| {
        tracing::debug!(target: "gate.auth.verifier", error = %e, "Payload is not base64url");
        AuthError::ClaimsInvalid(e.to_string())
    })?;

    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "gate.auth.verifier", error = %e, "Payload is not JSON");
        AuthError::ClaimsInvalid(e.to_string())
    })?;

    Claims::from_payload(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::KeySet;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed key set and counts fetches.
    struct StaticSource {
        keys: Arc<KeySet>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(keys: Vec<Jwk>) -> Arc<Self> {
            Arc::new(Self {
                keys: Arc::new(KeySet::new(keys)),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeySetSource for StaticSource {
        async fn fetch(&self) -> Result<Arc<KeySet>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&self.keys))
        }
    }

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kid: kid.to_string(),
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            key_use: Some("sig".to_string()),
            n: Some(URL_SAFE_NO_PAD.encode([0xc3u8; 256])),
            e: Some("AQAB".to_string()),
        }
    }

    fn token(header: &str, tail: &str) -> String {
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header), tail)
    }

    fn verifier(source: &Arc<StaticSource>) -> TokenVerifier {
        TokenVerifier::new(Arc::clone(source) as Arc<dyn KeySetSource>)
    }

    // =========================================================================
    // Rejections before the key set is fetched
    // =========================================================================

    #[tokio::test]
    async fn test_single_segment_rejected_without_fetch() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);

        let result = verifier(&source).verify("not-a-token").await;

        assert!(matches!(result, Err(AuthError::Structural(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_alg_none_rejected_without_fetch() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"none","kid":"k1"}"#, "e30.");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::AlgorithmMismatch(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_hmac_rejected_without_fetch() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"HS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::AlgorithmMismatch(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_alg_rejected() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::AlgorithmMismatch(_))));
    }

    #[tokio::test]
    async fn test_two_segments_rejected_without_fetch() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::Structural(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_four_segments_rejected_without_fetch() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30.c2ln.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::Structural(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_kid_rejected_without_fetch() {
        let source = StaticSource::new(vec![rsa_jwk("")]);
        let token = token(r#"{"alg":"RS256"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::KeyNotFound(_))));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_header() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);

        let result = verifier(&source).verify("@@@.e30.c2ln").await;

        assert!(matches!(result, Err(AuthError::MalformedHeader(_))));
        assert_eq!(source.calls(), 0);
    }

    // =========================================================================
    // Key resolution and usability
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_kid() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"RS256","kid":"k2"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert_eq!(result.unwrap_err(), AuthError::KeyNotFound("k2".to_string()));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_rsa_key_is_key_format() {
        let mut jwk = rsa_jwk("k1");
        jwk.kty = "EC".to_string();
        let source = StaticSource::new(vec![jwk]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::KeyFormat(_))));
    }

    #[tokio::test]
    async fn test_encryption_key_is_key_format() {
        let mut jwk = rsa_jwk("k1");
        jwk.key_use = Some("enc".to_string());
        let source = StaticSource::new(vec![jwk]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::KeyFormat(_))));
    }

    #[tokio::test]
    async fn test_key_bound_to_other_alg() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"PS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::AlgorithmMismatch(_))));
    }

    #[tokio::test]
    async fn test_key_missing_modulus() {
        let mut jwk = rsa_jwk("k1");
        jwk.n = None;
        let source = StaticSource::new(vec![jwk]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::KeyFormat(_))));
    }

    #[tokio::test]
    async fn test_undersized_key_is_key_format() {
        let mut jwk = rsa_jwk("k1");
        jwk.n = Some("wwE".to_string());
        let source = StaticSource::new(vec![jwk]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert!(matches!(result, Err(AuthError::KeyFormat(_))));
    }

    #[tokio::test]
    async fn test_bad_signature_is_signature_invalid() {
        let source = StaticSource::new(vec![rsa_jwk("k1")]);
        let token = token(r#"{"alg":"RS256","kid":"k1"}"#, "e30.c2ln");

        let result = verifier(&source).verify(&token).await;

        assert_eq!(result.unwrap_err(), AuthError::SignatureInvalid);
    }

    // =========================================================================
    // Payload decoding
    // =========================================================================

    #[test]
    fn test_decode_claims_object() {
        let claims = decode_claims(&URL_SAFE_NO_PAD.encode(r#"{"sub":"u1"}"#)).unwrap();
        assert_eq!(claims.subject(), Some("u1"));
    }

    #[test]
    fn test_decode_claims_not_json() {
        assert!(matches!(
            decode_claims(&URL_SAFE_NO_PAD.encode("not json")),
            Err(AuthError::ClaimsInvalid(_))
        ));
    }

    #[test]
    fn test_decode_claims_not_object() {
        assert!(matches!(
            decode_claims(&URL_SAFE_NO_PAD.encode("[1,2,3]")),
            Err(AuthError::ClaimsInvalid(_))
        ));
    }

    #[test]
    fn test_decode_claims_bad_base64() {
        assert!(matches!(
            decode_claims("!!!"),
            Err(AuthError::ClaimsInvalid(_))
        ));
    }

    #[test]
    fn test_check_key_usable_without_optional_fields() {
        let mut jwk = rsa_jwk("k1");
        jwk.alg = None;
        jwk.key_use = None;

        assert!(check_key_usable(&jwk, SigningAlgorithm::Ps512).is_ok());
    }

    #[test]
    fn test_from_config_builds() {
        let config = ProviderConfig::new("http://localhost:8080", "reports")
            .unwrap()
            .with_cache_ttl(std::time::Duration::from_secs(300));
        let _verifier = TokenVerifier::from_config(&config);
    }
}
