//! Token Gate - Main Application Entry Point
//!
//! A REST API server demonstrating signed-token login/refresh/authorize,
//! static API key authentication and a served OpenAPI document.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Tokens**: HMAC-signed JWTs via jsonwebtoken
//! - **API keys**: SHA-256 digests compared in constant time
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Validate token settings (an empty secret aborts startup)
//! 3. Build the token service, credential store and key validator
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use std::sync::Arc;

use token_gate::{
    config::Config,
    services::{
        credential_store::StaticCredentialStore, key_validator::StaticKeyValidator,
        token_service::TokenService,
    },
    state::AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let settings = config.jwt_settings()?;
    tracing::info!("Configuration loaded: {:?}", settings);

    let tokens = TokenService::new(settings, Arc::new(StaticCredentialStore::demo()))?;
    let keys = StaticKeyValidator::new(&config.api_keys);
    tracing::info!("Token service ready, {} API key(s) configured", keys.len());

    let app = token_gate::app(AppState::new(tokens, keys));

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
