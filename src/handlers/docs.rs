//! # OpenAPI Document
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/swagger/doc.json`. Rendering a documentation UI is left to whatever
//! viewer is pointed at that URL.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{
    error::ErrorBody,
    handlers::ping::{MessageResponse, PingResponse},
    models::{
        identity::LoginRequest,
        token::{LogoutResponse, TokenResponse},
    },
};

/// Adds the two bearer schemes: signed tokens and static API keys.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "token_gate",
        description = "Token login/refresh/authorize flow, static API key auth and a public ping."
    ),
    paths(
        crate::handlers::ping::ping,
        crate::handlers::ping::auth_ping,
        crate::handlers::ping::apikey_ping,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::logout,
    ),
    components(schemas(
        ErrorBody,
        LoginRequest,
        LogoutResponse,
        MessageResponse,
        PingResponse,
        TokenResponse
    )),
    tags(
        (name = "auth", description = "Token issuance and token-protected routes"),
        (name = "demo", description = "Public and API-key protected routes")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Serve the OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
