//! Common utilities shared across Realm Gate crates.

#![warn(clippy::pedantic)]

/// Module for compact-token utilities (size limits, segment splitting, base64url decoding)
pub mod jwt;
