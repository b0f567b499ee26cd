//! Compact-token utilities shared across Realm Gate crates.
//!
//! This module knows nothing about keys or providers. It provides:
//! - Size limits for DoS prevention
//! - Splitting a compact token into its dot-separated segments
//! - Padding-tolerant base64url decoding for header/payload segments
//! - Strict unpadded base64url decoding for JWK numeric fields
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE splitting or decoding
//! - Nothing in this module trusts the decoded content; callers must verify
//!   the signature over [`TokenSegments::signing_input`] before using claims
//! - The signing input is a slice of the original token, never a
//!   re-serialization of decoded JSON
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_token, decode_segment};
//!
//! let segments = split_token(token)?;
//! let header_bytes = decode_segment(segments.header)?;
//! ```

use base64::{
    alphabet,
    engine::{general_purpose::URL_SAFE_NO_PAD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any splitting, decoding or
/// network activity.
///
/// # Rationale
///
/// - Typical provider-issued RS256 tokens are 800-2000 bytes
/// - Large role lists can push a token past 4KB, 8KB leaves headroom
/// - Rejecting early keeps an oversized credential from costing a key-set fetch
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Minimum number of segments needed to read the header.
pub const MIN_HEADER_SEGMENTS: usize = 2;

/// Number of segments in a complete compact token (header.payload.signature).
pub const COMPACT_SEGMENTS: usize = 3;

/// base64url engine that accepts both padded and unpadded input.
///
/// Compact encoding omits padding, but some issuers emit it anyway.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Error Types
// =============================================================================

/// Structural problems with a compact token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtFormatError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("token is {0} bytes, exceeding the maximum allowed size")]
    TokenTooLarge(usize),

    /// Token has fewer than [`MIN_HEADER_SEGMENTS`] dot-separated segments.
    #[error("token has {0} segment(s), at least 2 are required")]
    TooFewSegments(usize),

    /// A segment is not valid base64url.
    #[error("segment is not valid base64url: {0}")]
    InvalidBase64(String),
}

// =============================================================================
// Types
// =============================================================================

/// The dot-separated segments of a compact token, borrowed from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSegments<'a> {
    /// First segment (base64url header JSON).
    pub header: &'a str,

    /// Second segment (base64url payload JSON).
    pub payload: &'a str,

    /// Third segment (base64url signature), absent for two-segment input.
    pub signature: Option<&'a str>,

    /// Exact bytes `header + "." + payload` as received.
    pub signing_input: &'a str,

    /// Total number of segments found.
    pub segment_count: usize,
}

impl TokenSegments<'_> {
    /// Returns true if the token has exactly header, payload and signature.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.segment_count == COMPACT_SEGMENTS
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact token into its segments without decoding anything.
///
/// Two segments are enough to read the header; callers that verify a
/// signature must additionally check [`TokenSegments::is_complete`].
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `TooFewSegments` - token has fewer than two segments
pub fn split_token(token: &str) -> Result<TokenSegments<'_>, JwtFormatError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtFormatError::TokenTooLarge(token.len()));
    }

    let parts: Vec<&str> = token.split('.').collect();
    let segment_count = parts.len();

    let (Some(header), Some(payload)) = (parts.first(), parts.get(1)) else {
        tracing::debug!(
            target: "common.jwt",
            parts = segment_count,
            "Token rejected: too few segments"
        );
        return Err(JwtFormatError::TooFewSegments(segment_count));
    };

    // header and payload are prefixes of token separated by a single '.'
    let signing_input_len = header.len() + 1 + payload.len();
    let signing_input = token
        .get(..signing_input_len)
        .ok_or(JwtFormatError::TooFewSegments(segment_count))?;

    Ok(TokenSegments {
        header,
        payload,
        signature: parts.get(2).copied(),
        signing_input,
        segment_count,
    })
}

/// Decode a header or payload segment, tolerating optional `=` padding.
///
/// # Errors
///
/// Returns `JwtFormatError::InvalidBase64` if the segment is not base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, JwtFormatError> {
    URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| JwtFormatError::InvalidBase64(e.to_string()))
}

/// Decode an unpadded base64url value such as a JWK `n` or `e` field.
///
/// # Errors
///
/// Returns `JwtFormatError::InvalidBase64` if the value is not unpadded base64url.
pub fn decode_unpadded(value: &str) -> Result<Vec<u8>, JwtFormatError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| JwtFormatError::InvalidBase64(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
