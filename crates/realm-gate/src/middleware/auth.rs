//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token from the Authorization header, verifies it, and
//! injects the claims into request extensions. Any other scheme, or no
//! credential at all, is rejected without invoking the verifier.

use crate::auth::{Claims, TokenVerifier};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Token verifier shared across requests.
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    /// Wrap a verifier for use as middleware state.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme must be exactly `Bearer ` and the token non-empty.
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` if the header is missing, not
/// valid ASCII, uses another scheme, or carries an empty token.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gate.middleware.auth", "Missing Authorization header");
            AuthError::MissingCredentials
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "gate.middleware.auth", "Invalid Authorization header format");
        AuthError::MissingCredentials
    })?;

    if token.is_empty() {
        tracing::debug!(target: "gate.middleware.auth", "Empty bearer token");
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Authentication middleware that verifies bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if the token is missing or invalid
/// - Continues to next handler with claims in extensions if the token is valid
#[instrument(skip(state, req, next), name = "gate.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let claims = {
        let token = extract_bearer(req.headers())?;
        state.verifier.verify(token).await.inspect_err(|e| {
            tracing::info!(target: "gate.middleware.auth", kind = e.kind(), "Token rejected");
        })?
    };

    // Store claims in request extensions for downstream handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Get the authenticated claims from request extensions.
    ///
    /// Returns `None` if auth middleware was not applied to this request.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    // Full middleware tests need a signing key and a key-set endpoint; those
    // live in tests/middleware_tests.rs.

    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }

    #[test]
    fn test_extract_bearer() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_bearer_missing_header() {
        assert_eq!(
            extract_bearer(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_extract_bearer_other_schemes() {
        for value in ["Basic dXNlcjpwYXNz", "bearer abc", "Token abc", "Bearerabc", "abc.def.ghi"] {
            assert_eq!(
                extract_bearer(&headers_with(value)),
                Err(AuthError::MissingCredentials),
                "{value} must be rejected"
            );
        }
    }

    #[test]
    fn test_extract_bearer_empty_token() {
        assert_eq!(
            extract_bearer(&headers_with("Bearer ")),
            Err(AuthError::MissingCredentials)
        );
    }
}
