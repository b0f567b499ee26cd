//! Token verification pipeline.
//!
//! This module verifies bearer tokens against the signing keys published by
//! the identity provider for the configured realm.
//!
//! # Components
//!
//! - `token` - Splits the token and decodes the (still untrusted) header
//! - `jwks` - Key-set wire types, the `KeySetSource` seam, and kid resolution
//! - `cache` - Optional TTL-bounded key-set cache
//! - `key` - RSA public key materialization from JWK fields
//! - `signature` - Closed set of accepted algorithms and signature checking
//! - `claims` - Verified payload and the claims validation hook
//! - `verifier` - Orchestrates the above into `TokenVerifier::verify`

pub mod cache;
pub mod claims;
pub mod jwks;
pub mod key;
pub mod signature;
pub mod token;
pub mod verifier;

pub use cache::CachedKeySetSource;
pub use claims::{AcceptAllClaims, Claims, ClaimsValidator};
pub use jwks::{HttpKeySetSource, Jwk, KeySet, KeySetSource};
pub use key::PublicKey;
pub use signature::SigningAlgorithm;
pub use token::{parse_token, ParsedToken, TokenHeader};
pub use verifier::TokenVerifier;
