//! Data models shared by handlers, middleware and services.
//!
//! Nothing here is persisted: credentials live for one login request,
//! identities and claims for one authenticated request.

/// Token claims and the per-request claims extension
pub mod claims;
/// Login credentials and the identity they resolve to
pub mod identity;
/// Token issuance responses
pub mod token;
