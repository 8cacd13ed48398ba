//! Error types and HTTP error response handling.
//!
//! This module defines every error the service can produce and how they are
//! converted into HTTP responses with appropriate status codes and JSON bodies.
//! Startup problems live in [`ConfigError`] and never reach a client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Request-time error type.
///
/// Every failure of the login, verification, refresh, authorization and
/// API-key flows is one of these variants. They are all recovered at the
/// middleware or handler boundary and rendered as [`ErrorBody`].
///
/// # Error Categories
///
/// - **Login**: `MissingCredentials`, `FailedAuthentication`
/// - **Verification**: `MalformedToken`, `InvalidSignature`, `Expired`
/// - **Refresh**: `RefreshWindowExceeded`
/// - **Authorization**: `Forbidden`
/// - **API key**: `MissingApiKey`, `InvalidApiKey`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    /// Login body lacked a username or password (or was not valid JSON).
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("missing Username or Password")]
    MissingCredentials,

    /// Credentials did not match any known identity.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("incorrect Username or Password")]
    FailedAuthentication,

    /// Token could not be located or parsed.
    ///
    /// The string says which part was wrong (empty header, wrong scheme,
    /// bad segments, missing claim). Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    MalformedToken(&'static str),

    /// Token signature does not match the configured secret and algorithm.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("signature is invalid")]
    InvalidSignature,

    /// Token is past its `exp` claim.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("token is expired")]
    Expired,

    /// Token is too old to be exchanged for a new one.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("token refresh window exceeded")]
    RefreshWindowExceeded,

    /// Identity is valid but the authorization policy denied the route.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("you don't have permission to access this resource")]
    Forbidden,

    /// Signing the claims failed.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("failed to create JWT Token")]
    TokenCreation,

    /// API key header is absent or does not use the Bearer scheme.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("missing or malformed API Key")]
    MissingApiKey,

    /// API key was rejected by the validator.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("invalid or expired API Key")]
    InvalidApiKey,
}

impl AppError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::MissingApiKey => StatusCode::BAD_REQUEST,
            AppError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingCredentials
            | AppError::FailedAuthentication
            | AppError::MalformedToken(_)
            | AppError::InvalidSignature
            | AppError::Expired
            | AppError::RefreshWindowExceeded
            | AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,
        }
    }
}

/// JSON body of every error response.
///
/// ```json
/// {
///   "code": 401,
///   "message": "token is expired"
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body for clients that only see JSON
    pub code: u16,

    /// Human-readable error message
    pub message: String,
}

/// Build a `{code, message}` JSON response with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        code: status.as_u16(),
        message: message.to_string(),
    };

    (status, Json(body)).into_response()
}

/// Convert AppError into an HTTP response.
///
/// This allows handlers and middleware to return `Result<T, AppError>`.
/// The token middleware does not go through this impl: it renders its
/// failures with the configured unauthorized responder so it can add the
/// realm challenge header.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        json_error(self.status(), &self.to_string())
    }
}

/// Fatal configuration problems detected before the server starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `JWT_SECRET` is absent or empty.
    #[error("secret key is required")]
    MissingSecretKey,

    /// Algorithm name is unknown or not an HMAC algorithm.
    #[error("invalid signing algorithm: {0}")]
    InvalidSigningAlgorithm(String),

    /// Token lookup string could not be parsed.
    #[error("invalid token lookup: {0}")]
    InvalidTokenLookup(String),

    /// Token timeout must be a positive number of seconds.
    #[error("token timeout must be positive")]
    InvalidTimeout,

    /// Environment variables could not be deserialized.
    #[error("environment error: {0}")]
    Env(#[from] envy::Error),
}
