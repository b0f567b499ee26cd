//! Authentication error taxonomy.
//!
//! Every kind is fail-closed: the token is rejected and nothing in it is
//! trusted. The specific kind is preserved for logs and diagnostics, but the
//! `IntoResponse` impl collapses all per-request kinds into the same generic
//! 401 so callers learn nothing about which check failed.

use crate::config::ConfigError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtFormatError;
use serde::Serialize;
use thiserror::Error;

/// Value of the `WWW-Authenticate` header sent with every 401.
const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"realm-gate\", error=\"invalid_token\"";

/// Authentication error type.
///
/// Maps to HTTP status codes:
/// - Config: 500 Internal Server Error (startup-class, should not reach requests)
/// - Everything else: 401 Unauthorized with an identical body
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Required provider configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No `Authorization: Bearer <token>` credential on the request.
    #[error("Missing or invalid Authorization header")]
    MissingCredentials,

    /// Token exceeds the maximum accepted size.
    #[error("Token too large: {0} bytes")]
    TokenTooLarge(usize),

    /// Token does not have the required number of segments.
    #[error("Token structure invalid: {0}")]
    Structural(String),

    /// Header segment is not valid base64url or not a JSON object.
    #[error("Malformed token header: {0}")]
    MalformedHeader(String),

    /// Key-set endpoint unreachable, non-success status, or unparseable body.
    #[error("Key-set fetch failed: {0}")]
    Fetch(String),

    /// No published key matches the token's key identifier.
    #[error("No signing key found for kid '{0}'")]
    KeyNotFound(String),

    /// The matched key cannot be turned into an RSA public key.
    #[error("Signing key unusable: {0}")]
    KeyFormat(String),

    /// Declared algorithm is not an accepted RSA signature algorithm.
    #[error("Algorithm not accepted: {0}")]
    AlgorithmMismatch(String),

    /// Signature does not verify under the resolved key.
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// Payload is not the expected claims shape, or the claims hook rejected it.
    #[error("Claims invalid: {0}")]
    ClaimsInvalid(String),
}

impl AuthError {
    /// Stable identifier of the error kind, for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Config(_) => "config",
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::TokenTooLarge(_) => "token_too_large",
            AuthError::Structural(_) => "structural",
            AuthError::MalformedHeader(_) => "malformed_header",
            AuthError::Fetch(_) => "fetch",
            AuthError::KeyNotFound(_) => "key_not_found",
            AuthError::KeyFormat(_) => "key_format",
            AuthError::AlgorithmMismatch(_) => "algorithm_mismatch",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::ClaimsInvalid(_) => "claims_invalid",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Config(_) => 500,
            _ => 401,
        }
    }
}

/// Map structural token problems onto the request taxonomy.
impl From<JwtFormatError> for AuthError {
    fn from(err: JwtFormatError) -> Self {
        match err {
            JwtFormatError::TokenTooLarge(size) => AuthError::TokenTooLarge(size),
            JwtFormatError::TooFewSegments(_) => AuthError::Structural(err.to_string()),
            JwtFormatError::InvalidBase64(_) => AuthError::MalformedHeader(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::Config(err) => {
                tracing::error!(target: "gate.auth", error = %err, "Verifier misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
            other => {
                // Log actual kind server-side, return generic message to client
                tracing::debug!(
                    target: "gate.auth",
                    kind = other.kind(),
                    error = %other,
                    "Request rejected as unauthorized"
                );
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized")
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}
