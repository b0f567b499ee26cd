//! Accepted signature algorithms and signature checking.
//!
//! Only RSA algorithms are accepted. The set is closed: `none`, HMAC and
//! elliptic-curve algorithms are rejected before any key is fetched, so a
//! token can never choose a weaker scheme than the provider signs with.

use crate::auth::key::PublicKey;
use crate::errors::AuthError;
use jsonwebtoken::Algorithm;
use std::fmt;
use std::str::FromStr;

/// RSA signature algorithms accepted in a token header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    Rs512,
    /// RSASSA-PSS with SHA-256.
    Ps256,
    /// RSASSA-PSS with SHA-384.
    Ps384,
    /// RSASSA-PSS with SHA-512.
    Ps512,
}

impl SigningAlgorithm {
    /// Algorithm name as it appears in the `alg` header.
    pub fn as_str(self) -> &'static str {
        match self {
            SigningAlgorithm::Rs256 => "RS256",
            SigningAlgorithm::Rs384 => "RS384",
            SigningAlgorithm::Rs512 => "RS512",
            SigningAlgorithm::Ps256 => "PS256",
            SigningAlgorithm::Ps384 => "PS384",
            SigningAlgorithm::Ps512 => "PS512",
        }
    }

    /// Check a declared header algorithm against the accepted set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlgorithmMismatch` if the algorithm is absent or
    /// not an accepted RSA algorithm.
    pub fn from_header(alg: Option<&str>) -> Result<Self, AuthError> {
        let alg = alg.ok_or_else(|| AuthError::AlgorithmMismatch("missing alg".to_string()))?;
        alg.parse()
    }

    fn algorithm(self) -> Algorithm {
        match self {
            SigningAlgorithm::Rs256 => Algorithm::RS256,
            SigningAlgorithm::Rs384 => Algorithm::RS384,
            SigningAlgorithm::Rs512 => Algorithm::RS512,
            SigningAlgorithm::Ps256 => Algorithm::PS256,
            SigningAlgorithm::Ps384 => Algorithm::PS384,
            SigningAlgorithm::Ps512 => Algorithm::PS512,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = AuthError;

    // Exact, case-sensitive match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(SigningAlgorithm::Rs256),
            "RS384" => Ok(SigningAlgorithm::Rs384),
            "RS512" => Ok(SigningAlgorithm::Rs512),
            "PS256" => Ok(SigningAlgorithm::Ps256),
            "PS384" => Ok(SigningAlgorithm::Ps384),
            "PS512" => Ok(SigningAlgorithm::Ps512),
            other => Err(AuthError::AlgorithmMismatch(other.to_string())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verify `signature` (base64url) over the exact `signing_input` bytes.
///
/// # Errors
///
/// Returns `AuthError::SignatureInvalid` if the signature does not verify,
/// including when it is not valid base64url.
pub fn verify_signature(
    signing_input: &str,
    signature: &str,
    key: &PublicKey,
    alg: SigningAlgorithm,
) -> Result<(), AuthError> {
    let decoding_key = key.decoding_key();

    match jsonwebtoken::crypto::verify(
        signature,
        signing_input.as_bytes(),
        &decoding_key,
        alg.algorithm(),
    ) {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::debug!(target: "gate.auth.token", alg = %alg, "Signature mismatch");
            Err(AuthError::SignatureInvalid)
        }
        Err(e) => {
            tracing::debug!(target: "gate.auth.token", alg = %alg, error = %e, "Signature check failed");
            Err(AuthError::SignatureInvalid)
        }
    }
}
