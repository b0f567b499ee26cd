//! RSA public key materialization.
//!
//! Converts a JWK's base64url `n` and `e` fields into an RSA public key.

use crate::auth::jwks::Jwk;
use crate::errors::AuthError;
use common::jwt::decode_unpadded;
use jsonwebtoken::DecodingKey;
use std::fmt;

/// Smallest modulus accepted, in bits.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Largest modulus accepted, in bits.
pub const MAX_MODULUS_BITS: usize = 8192;

/// RSA public key (modulus and exponent).
///
/// The modulus is kept as big-endian bytes without leading zeros.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    modulus: Vec<u8>,
    exponent: u64,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("modulus_bits", &self.modulus_bits())
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl PublicKey {
    /// Build a key from big-endian modulus and exponent bytes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyFormat` if the modulus is zero or outside
    /// `MIN_MODULUS_BITS..=MAX_MODULUS_BITS`, or if the exponent is empty,
    /// wider than 64 bits, even, or below 3.
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<Self, AuthError> {
        let first_nonzero = modulus.iter().position(|byte| *byte != 0);
        let modulus: Vec<u8> = match first_nonzero {
            Some(start) => modulus.iter().skip(start).copied().collect(),
            None => {
                return Err(AuthError::KeyFormat("modulus is zero".to_string()));
            }
        };

        let exponent = decode_exponent(exponent)?;
        if exponent == 0 {
            return Err(AuthError::KeyFormat("exponent is zero".to_string()));
        }
        if exponent < 3 || exponent % 2 == 0 {
            return Err(AuthError::KeyFormat(format!(
                "exponent {} must be odd and at least 3",
                exponent
            )));
        }

        let key = Self { modulus, exponent };
        let bits = key.modulus_bits();
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&bits) {
            return Err(AuthError::KeyFormat(format!(
                "modulus is {} bits, expected {}..={}",
                bits, MIN_MODULUS_BITS, MAX_MODULUS_BITS
            )));
        }

        Ok(key)
    }

    /// Modulus as big-endian bytes without leading zeros.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Public exponent.
    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    /// Size of the modulus in bits.
    pub fn modulus_bits(&self) -> usize {
        let leading = self
            .modulus
            .first()
            .map_or(0, |byte| byte.leading_zeros() as usize);
        self.modulus.len() * 8 - leading
    }

    /// Exponent as big-endian bytes without leading zeros.
    pub fn exponent_bytes(&self) -> Vec<u8> {
        let skip = (self.exponent.leading_zeros() / 8) as usize;
        self.exponent.to_be_bytes().iter().skip(skip).copied().collect()
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_rsa_raw_components(&self.modulus, &self.exponent_bytes())
    }
}

/// Interpret big-endian bytes as an unsigned exponent.
///
/// Bytes are accumulated most-significant first (`e = e * 256 + byte`).
///
/// # Errors
///
/// Returns `AuthError::KeyFormat` if `bytes` is empty or the value does not
/// fit in 64 bits.
pub fn decode_exponent(bytes: &[u8]) -> Result<u64, AuthError> {
    if bytes.is_empty() {
        return Err(AuthError::KeyFormat("exponent is empty".to_string()));
    }

    bytes.iter().try_fold(0u64, |acc, byte| {
        acc.checked_mul(256)
            .and_then(|shifted| shifted.checked_add(u64::from(*byte)))
            .ok_or_else(|| AuthError::KeyFormat("exponent exceeds 64 bits".to_string()))
    })
}

/// Materialize the RSA public key described by a JWK.
///
/// Only the numeric fields are read; key type and algorithm checks belong to
/// the caller.
///
/// # Errors
///
/// Returns `AuthError::KeyFormat` if `n` or `e` is missing, is not unpadded
/// base64url, or does not describe a usable integer.
pub fn materialize(jwk: &Jwk) -> Result<PublicKey, AuthError> {
    let n = jwk.n.as_deref().ok_or_else(|| {
        tracing::warn!(target: "gate.auth.key", kid = %jwk.kid, "JWK missing n field");
        AuthError::KeyFormat("missing modulus (n)".to_string())
    })?;
    let e = jwk.e.as_deref().ok_or_else(|| {
        tracing::warn!(target: "gate.auth.key", kid = %jwk.kid, "JWK missing e field");
        AuthError::KeyFormat("missing exponent (e)".to_string())
    })?;

    let modulus = decode_unpadded(n).map_err(|err| {
        tracing::warn!(target: "gate.auth.key", kid = %jwk.kid, error = %err, "Invalid modulus encoding");
        AuthError::KeyFormat(format!("modulus: {}", err))
    })?;
    let exponent = decode_unpadded(e).map_err(|err| {
        tracing::warn!(target: "gate.auth.key", kid = %jwk.kid, error = %err, "Invalid exponent encoding");
        AuthError::KeyFormat(format!("exponent: {}", err))
    })?;

    let key = PublicKey::from_components(&modulus, &exponent).inspect_err(|err| {
        tracing::warn!(target: "gate.auth.key", kid = %jwk.kid, error = %err, "Unusable key components");
    })?;

    tracing::debug!(
        target: "gate.auth.key",
        kid = %jwk.kid,
        modulus_bits = key.modulus_bits(),
        exponent = key.exponent(),
        "Public key materialized"
    );

    Ok(key)
}
