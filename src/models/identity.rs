//! Login credentials and authenticated identities.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// The authenticated principal.
///
/// Built by the credential verifier on login and rebuilt from token claims
/// on every later request. Only the username travels inside the token, so
/// identities resolved from claims carry empty first/last names unless a
/// custom claims builder stores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl Identity {
    /// Identity known only by its username.
    pub fn from_username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}

/// Validated login credentials.
///
/// Transient: only exists for the duration of a login request.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body for `POST /login`.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "admin",
///   "password": "admin"
/// }
/// ```
///
/// # Validation
///
/// Both fields are required and must be non-empty. They are optional here
/// so that a missing field becomes `MissingCredentials` rather than an
/// extractor rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Turn the raw body into credentials, rejecting absent or empty fields.
    pub fn into_credentials(self) -> Result<Credentials, AppError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Credentials { username, password })
            }
            _ => Err(AppError::MissingCredentials),
        }
    }
}
