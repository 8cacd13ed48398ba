//! Login, refresh and logout HTTP handlers.
//!
//! This module implements the token endpoints:
//! - POST /login - Exchange username/password for a token
//! - GET /auth/refresh_token - Exchange a (possibly just expired) token for a new one
//! - POST /logout - Drop the token cookie, if cookies are in use
//!
//! Failures are rendered with the token service's unauthorized responder so
//! they look the same as middleware rejections.

use crate::{
    error::ErrorBody,
    models::{
        identity::LoginRequest,
        token::{IssuedToken, LogoutResponse, TokenResponse},
    },
    services::token_service::TokenService,
    state::AppState,
};
use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::{
        HeaderMap, Uri,
        header::{CONTENT_TYPE, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};

/// Log in and receive a token.
///
/// # Endpoint
///
/// `POST /login`
///
/// # Request Body
///
/// ```json
/// {
///   "username": "admin",
///   "password": "admin"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"code":200,"token":"...","expire":"..."}`
/// - **Error (401)**: missing fields or unknown credentials
///
/// The body may also be `application/x-www-form-urlencoded`. A body that
/// cannot be read in its declared format is treated like one with missing
/// fields.
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body(
        content(
            (LoginRequest = "application/json"),
            (LoginRequest = "application/x-www-form-urlencoded")
        )
    ),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Missing or incorrect credentials", body = ErrorBody)
    )
)]
pub async fn login(State(state): State<AppState>, request: Request) -> Response {
    let issued = read_login_body(request)
        .await
        .into_credentials()
        .and_then(|credentials| {
            let username = credentials.username.clone();
            let issued = state.tokens.issue_token(&credentials);
            match &issued {
                Ok(_) => tracing::info!("Issued token for {}", username),
                Err(e) => tracing::warn!("Login failed for {}: {}", username, e),
            }
            issued
        });

    match issued {
        Ok(issued) => token_response(&state.tokens, issued),
        Err(e) => state.tokens.unauthorized_response(&e),
    }
}

/// Refresh a token.
///
/// # Endpoint
///
/// `GET /auth/refresh_token`
///
/// # Authentication
///
/// The current token, found through the configured lookup. It may be
/// expired as long as the refresh window since it was issued is open.
///
/// # Response
///
/// - **Success (200 OK)**: a new token with the same claims
/// - **Error (401)**: missing, forged or too old token
#[utoipa::path(
    get,
    path = "/auth/refresh_token",
    tag = "auth",
    security(("jwt" = [])),
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Token missing, invalid or past the refresh window", body = ErrorBody)
    )
)]
pub async fn refresh_token(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let refreshed = state
        .tokens
        .extract_token(&headers, &uri)
        .and_then(|raw| state.tokens.refresh_token(&raw));

    match refreshed {
        Ok(issued) => {
            tracing::info!("Refreshed token, new expiry {}", issued.expire);
            token_response(&state.tokens, issued)
        }
        Err(e) => {
            tracing::warn!("Refresh rejected: {}", e);
            state.tokens.unauthorized_response(&e)
        }
    }
}

/// Log out.
///
/// Tokens are not revoked; they expire on their own. When cookies are
/// enabled the token cookie is cleared.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out", body = LogoutResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Json(LogoutResponse { code: 200 }).into_response();

    if let Some(cookie) = state.tokens.clear_cookie() {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }

    response
}

/// Parse the login body as a form or JSON, depending on `Content-Type`.
async fn read_login_body(request: Request) -> LoginRequest {
    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let parsed = if is_form {
        Form::<LoginRequest>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|rejection| rejection.to_string())
    } else {
        Json::<LoginRequest>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|rejection| rejection.to_string())
    };

    parsed.unwrap_or_else(|rejection| {
        tracing::debug!("Unreadable login body: {}", rejection);
        LoginRequest::default()
    })
}

/// 200 with the token body, plus the cookie when enabled.
fn token_response(tokens: &TokenService, issued: IssuedToken) -> Response {
    let cookie = tokens.token_cookie(&issued.token);
    let mut response = Json(TokenResponse::from(issued)).into_response();

    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }

    response
}
