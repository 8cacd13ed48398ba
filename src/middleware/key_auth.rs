//! API key authentication middleware.
//!
//! This middleware intercepts every key-protected request to:
//! 1. Extract the API key from the Authorization header
//! 2. Ask the configured validator whether the key is acceptable
//! 3. Inject the key into the request
//! 4. Reject malformed (400) or unknown (401) keys

use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// The accepted API key, inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey(pub String);

/// API key authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer test_admin
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if the key is accepted (calls next handler)
/// - `Err(AppError::MissingApiKey)` if the header is absent or not Bearer (400)
/// - `Err(AppError::InvalidApiKey)` if the validator rejects the key (401)
pub async fn key_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::MissingApiKey)?;

    // Step 2: Extract Bearer key
    let api_key = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(AppError::MissingApiKey)?
        .to_string();

    // Step 3: Validate
    if !state.keys.validate(&api_key) {
        tracing::warn!("Rejected API key for {}", request.uri().path());
        return Err(AppError::InvalidApiKey);
    }

    // Step 4: Inject key into request extensions
    request.extensions_mut().insert(ApiKey(api_key));

    Ok(next.run(request).await)
}
