//! Token Gate - signed-token and API-key authentication for an axum service.
//!
//! # Routes
//!
//! | Route                      | Protection          | Handler                       |
//! |----------------------------|---------------------|-------------------------------|
//! | `GET /health`              | none                | [`handlers::health`]          |
//! | `GET /ping`                | none                | [`handlers::ping::ping`]      |
//! | `GET /swagger/doc.json`    | none                | [`handlers::docs`]            |
//! | `POST /login`              | none                | [`handlers::auth::login`]     |
//! | `POST /logout`             | none                | [`handlers::auth::logout`]    |
//! | `GET /auth/refresh_token`  | token (may be expired) | [`handlers::auth::refresh_token`] |
//! | `GET /auth/ping`           | token middleware    | [`handlers::ping::auth_ping`] |
//! | `GET /apikey/ping`         | API key middleware  | [`handlers::ping::apikey_ping`] |
//! | anything else              | token middleware    | [`handlers::ping::not_found`] |
//!
//! # Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → (token | API key) middleware → Handler
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

use axum::{
    Router,
    handler::Handler,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP router with routes and middleware.
pub fn app(state: AppState) -> Router {
    // Routes behind the token middleware
    let token_routes = Router::new()
        .route("/auth/ping", get(handlers::ping::auth_ping))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::jwt::jwt_middleware,
        ));

    // Routes behind the API key middleware
    let key_routes = Router::new()
        .route("/apikey/ping", get(handlers::ping::apikey_ping))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::key_auth::key_auth_middleware,
        ));

    // Unmatched routes still require a valid, authorized token
    let fallback = handlers::ping::not_found.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::jwt::jwt_middleware,
    ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/ping", get(handlers::ping::ping))
        .route("/swagger/doc.json", get(handlers::docs::openapi_json))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        // Refresh checks the token itself so recently expired tokens get through
        .route("/auth/refresh_token", get(handlers::auth::refresh_token))
        .merge(token_routes)
        .merge(key_routes)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
