//! Business logic services.
//!
//! Services contain the authentication logic separated from HTTP handlers
//! and middleware, which only extract request data and render results.

pub mod credential_store;
pub mod key_validator;
pub mod token_service;
