//! Token parsing.
//!
//! Splits a raw token and decodes its header. Nothing produced here is
//! trusted: the header only tells us which key and algorithm to try, and the
//! payload is not decoded until the signature has been verified.

use crate::errors::AuthError;
use common::jwt::{decode_segment, split_token, TokenSegments};
use serde::Deserialize;

/// Decoded token header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Identifier of the signing key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Declared signature algorithm.
    #[serde(default)]
    pub alg: Option<String>,

    /// Declared token type (informational only).
    #[serde(default)]
    pub typ: Option<String>,
}

/// A token whose header has been decoded but whose signature is unchecked.
#[derive(Debug, Clone)]
pub struct ParsedToken<'a> {
    header: TokenHeader,
    segments: TokenSegments<'a>,
}

impl<'a> ParsedToken<'a> {
    /// The decoded header.
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Key identifier, if present and non-empty.
    pub fn kid(&self) -> Option<&str> {
        self.header.kid.as_deref().filter(|kid| !kid.is_empty())
    }

    /// Raw payload segment, still base64url-encoded.
    pub fn payload_segment(&self) -> &'a str {
        self.segments.payload
    }

    /// Raw signature segment. `None` unless the token has exactly three segments.
    pub fn signature_segment(&self) -> Option<&'a str> {
        if self.segments.is_complete() {
            self.segments.signature
        } else {
            None
        }
    }

    /// Exact `header.payload` bytes as received; the input to the signature check.
    pub fn signing_input(&self) -> &'a str {
        self.segments.signing_input
    }

    /// Number of dot-separated segments in the raw token.
    pub fn segment_count(&self) -> usize {
        self.segments.segment_count
    }
}

/// Parse a raw token far enough to read its header.
///
/// Two segments are enough to succeed here; a missing signature is caught by
/// the verifier.
///
/// # Errors
///
/// - `AuthError::TokenTooLarge` - token exceeds the size limit
/// - `AuthError::Structural` - fewer than two segments
/// - `AuthError::MalformedHeader` - header is not base64url or not a JSON object
pub fn parse_token(raw: &str) -> Result<ParsedToken<'_>, AuthError> {
    let segments = split_token(raw)?;

    let header_bytes = decode_segment(segments.header).map_err(|e| {
        tracing::debug!(target: "gate.auth.token", error = %e, "Failed to decode token header base64");
        AuthError::MalformedHeader(e.to_string())
    })?;

    // Require an object explicitly; serde would also accept a JSON array for a struct.
    let value: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "gate.auth.token", error = %e, "Failed to parse token header JSON");
        AuthError::MalformedHeader(e.to_string())
    })?;

    if !value.is_object() {
        tracing::debug!(target: "gate.auth.token", "Token header is not a JSON object");
        return Err(AuthError::MalformedHeader(
            "header is not a JSON object".to_string(),
        ));
    }

    let header: TokenHeader = serde_json::from_value(value).map_err(|e| {
        tracing::debug!(target: "gate.auth.token", error = %e, "Token header fields have unexpected types");
        AuthError::MalformedHeader(e.to_string())
    })?;

    Ok(ParsedToken { header, segments })
}
