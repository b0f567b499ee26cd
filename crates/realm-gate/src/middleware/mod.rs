//! HTTP middleware.
//!
//! # Components
//!
//! - `auth` - Bearer token authentication for protected routes

pub mod auth;

pub use auth::{extract_bearer, require_auth, AuthState, ClaimsExt};
