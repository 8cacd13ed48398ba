//! Demo endpoints for each protection scheme, plus the fallback.

use crate::{
    error::ErrorBody,
    middleware::key_auth::ApiKey,
    models::{claims::TokenClaims, identity::Identity},
};
use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

/// Response body for `GET /ping` and `GET /apikey/ping`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub ping: String,
}

/// Response body for `GET /auth/ping`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Public liveness ping.
#[utoipa::path(
    get,
    path = "/ping",
    tag = "demo",
    responses((status = 200, description = "Always pong", body = PingResponse))
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        ping: "pong".to_string(),
    })
}

/// Echo the username of the token holder.
///
/// # Response (200 OK)
///
/// ```json
/// { "message": "username:admin" }
/// ```
#[utoipa::path(
    get,
    path = "/auth/ping",
    tag = "auth",
    security(("jwt" = [])),
    responses(
        (status = 200, description = "Authenticated and authorized", body = MessageResponse),
        (status = 401, description = "Token missing, invalid or expired", body = ErrorBody),
        (status = 403, description = "Identity not allowed on this route", body = ErrorBody)
    )
)]
pub async fn auth_ping(Extension(identity): Extension<Identity>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("username:{}", identity.username),
    })
}

/// Echo the accepted API key.
#[utoipa::path(
    get,
    path = "/apikey/ping",
    tag = "demo",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Key accepted", body = PingResponse),
        (status = 400, description = "Key missing or malformed", body = ErrorBody),
        (status = 401, description = "Key rejected", body = ErrorBody)
    )
)]
pub async fn apikey_ping(Extension(ApiKey(key)): Extension<ApiKey>) -> Json<PingResponse> {
    Json(PingResponse { ping: key })
}

/// Fallback for unmatched routes.
///
/// Runs behind the token middleware, so only authenticated and authorized
/// callers get the 404; everyone else gets the middleware's rejection.
pub async fn not_found(Extension(claims): Extension<TokenClaims>) -> (StatusCode, Json<Value>) {
    tracing::info!("NoRoute claims: {:?}", claims.0);

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "code": "PAGE_NOT_FOUND",
            "message": "Page not found"
        })),
    )
}
