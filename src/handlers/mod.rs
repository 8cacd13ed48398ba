//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, headers, extensions set by middleware)
//! 2. Calls into the services
//! 3. Returns HTTP response (JSON, status code)

/// Login, refresh and logout endpoints
pub mod auth;
/// OpenAPI document endpoint
pub mod docs;
/// Health check endpoint
pub mod health;
/// Demo ping endpoints and the fallback
pub mod ping;
