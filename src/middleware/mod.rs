//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Inject the authenticated context into request extensions
//! - Short-circuit requests (reject unauthenticated or unauthorized)

/// Signed token authentication and authorization
pub mod jwt;
/// Static API key authentication
pub mod key_auth;
