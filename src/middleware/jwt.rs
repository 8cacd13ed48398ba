//! Token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the configured lookup sources
//! 2. Verify its signature and expiry
//! 3. Resolve the identity carried in its claims
//! 4. Ask the authorization policy whether the identity may use the route
//! 5. Inject claims and identity into the request, or reject it

use crate::{
    error::AppError,
    models::{
        claims::{MapClaims, TokenClaims},
        identity::Identity,
    },
    services::token_service::TokenService,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: <TokenHeadName> <token>` (or query/cookie,
///    depending on the lookup configuration)
/// 2. Verify the token, failing with 401 on malformed, forged or expired tokens
/// 3. Resolve the identity from the claims
/// 4. Authorize the identity against the request path, failing with 403
/// 5. Insert `TokenClaims` and `Identity` into request extensions
/// 6. Call the next handler
///
/// # Failures
///
/// Rendered through the configured unauthorized responder; 401 responses
/// carry a `WWW-Authenticate: JWT realm=<realm>` challenge.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let tokens = state.tokens.as_ref();

    let (claims, identity) = match authenticate(tokens, &request) {
        Ok(authenticated) => authenticated,
        Err(e) => {
            tracing::warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            return tokens.unauthorized_response(&e);
        }
    };

    tracing::debug!("Authenticated {} for {}", identity.username, request.uri().path());

    // Route handlers can now extract these using Extension<...>
    request.extensions_mut().insert(TokenClaims(claims));
    request.extensions_mut().insert(identity);

    next.run(request).await
}

/// Run extraction, verification, identity resolution and authorization.
fn authenticate(
    tokens: &TokenService,
    request: &Request,
) -> Result<(MapClaims, Identity), AppError> {
    let raw = tokens.extract_token(request.headers(), request.uri())?;
    let claims = tokens.verify_token(&raw)?;
    let identity = tokens.resolve_identity(&claims)?;

    if !tokens.authorize(&identity, request.uri().path()) {
        return Err(AppError::Forbidden);
    }

    Ok((claims, identity))
}
