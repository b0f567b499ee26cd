//! # Realm Gate Test Utilities
//!
//! Shared test utilities for the realm-gate crate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys for reproducible tests)
//! - Test token builders (TestTokenBuilder)
//! - A mock identity provider serving a realm key set (MockJwksServer)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use realm_gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = test_signing_key(1)?;
//!     let server = MockJwksServer::start("reports", &[&key]).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_user("alice")
//!         .with_realm_role("reports:read")
//!         .sign_with(&key)?;
//!
//!     let verifier = TokenVerifier::from_config(&server.config());
//!     let claims = verifier.verify(&token).await?;
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_server;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_server::*;
pub use token_builders::*;

/// Install a test log subscriber once per process. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
