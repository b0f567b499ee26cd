//! Realm Gate Library
//!
//! Bearer-token verification against the signing keys an OpenID Connect
//! identity provider publishes for a realm.
//!
//! # Pipeline
//!
//! ```text
//! token -> auth::token (header, kid, alg)
//!       -> auth::jwks (fetch key set, resolve kid)
//!       -> auth::key (materialize RSA public key)
//!       -> auth::signature (verify over header.payload bytes)
//!       -> auth::claims (decode payload, run claims hook)
//! ```
//!
//! # Modules
//!
//! - `config` - Provider configuration from environment
//! - `errors` - Authentication error taxonomy with HTTP mapping
//! - `auth` - The verification pipeline
//! - `middleware` - Bearer credential extraction for axum routes

pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;

pub use auth::{Claims, TokenVerifier};
pub use config::{ConfigError, ProviderConfig};
pub use errors::AuthError;
