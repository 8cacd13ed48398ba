//! Shared application state.

use std::sync::Arc;

use crate::services::{key_validator::KeyValidator, token_service::TokenService};

/// State shared with every handler and middleware via `State` extraction.
///
/// Everything inside is read-only after startup, so cloning the state per
/// request only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub keys: Arc<dyn KeyValidator>,
}

impl AppState {
    pub fn new(tokens: TokenService, keys: impl KeyValidator + 'static) -> Self {
        Self {
            tokens: Arc::new(tokens),
            keys: Arc::new(keys),
        }
    }
}
