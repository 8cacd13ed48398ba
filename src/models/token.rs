//! Token issuance results and their HTTP representation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// A freshly signed token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expire: DateTime<Utc>,
}

/// Response body for `POST /login` and `GET /auth/refresh_token`.
///
/// # JSON Example
///
/// ```json
/// {
///   "code": 200,
///   "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
///   "expire": "2025-12-20T11:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub code: u16,
    pub token: String,
    /// RFC 3339 expiry time
    pub expire: String,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            code: 200,
            token: issued.token,
            expire: issued.expire.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Response body for `POST /logout`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub code: u16,
}
