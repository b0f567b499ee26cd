//! Verified token claims.
//!
//! Claims are only constructed after the signature has verified. The full
//! decoded payload is kept so callers can read any claim; the realm role
//! list is additionally parsed into a typed field. The `sub` claim is
//! redacted in Debug output to prevent exposure in logs.

use crate::errors::AuthError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Realm-level role grants (`realm_access` claim).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RealmAccess {
    /// Roles granted in the realm.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims of a verified token.
#[derive(Clone, PartialEq)]
pub struct Claims {
    payload: Map<String, Value>,
    realm_access: RealmAccess,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.payload.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("realm_roles", &self.realm_access.roles)
            .field("claim_names", &names)
            .finish()
    }
}

impl Claims {
    /// Build claims from a decoded payload.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ClaimsInvalid` if the payload is not a JSON object
    /// or `realm_access` does not have the expected shape.
    pub fn from_payload(payload: Value) -> Result<Self, AuthError> {
        let Value::Object(payload) = payload else {
            return Err(AuthError::ClaimsInvalid(
                "payload is not a JSON object".to_string(),
            ));
        };

        let realm_access = match payload.get("realm_access") {
            None | Some(Value::Null) => RealmAccess::default(),
            Some(value) => RealmAccess::deserialize(value)
                .map_err(|e| AuthError::ClaimsInvalid(format!("realm_access: {}", e)))?,
        };

        Ok(Self {
            payload,
            realm_access,
        })
    }

    /// Subject claim, if present as a string.
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }

    /// Realm roles granted to the token holder.
    pub fn realm_roles(&self) -> &[String] {
        &self.realm_access.roles
    }

    /// Check if the token grants a realm role. Exact match.
    pub fn has_realm_role(&self, role: &str) -> bool {
        self.realm_access.roles.iter().any(|r| r == role)
    }

    /// Raw value of any claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// The full decoded payload.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Consume the claims, returning the full decoded payload.
    pub fn into_map(self) -> Map<String, Value> {
        self.payload
    }
}

/// Claim-level validation applied after the signature verifies.
///
/// This is the extension point for expiry, not-before, and audience checks.
/// None are enforced by default.
pub trait ClaimsValidator: Send + Sync {
    /// Accept or reject verified claims.
    ///
    /// # Errors
    ///
    /// Implementations should return `AuthError::ClaimsInvalid` on rejection.
    fn validate(&self, claims: &Claims) -> Result<(), AuthError>;
}

/// Validator that accepts every token. Does not check expiry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllClaims;

impl ClaimsValidator for AcceptAllClaims {
    fn validate(&self, _claims: &Claims) -> Result<(), AuthError> {
        Ok(())
    }
}
