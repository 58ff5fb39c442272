/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Shared application state passed to every Axum handler via `State`.

use std::sync::Arc;

use crate::config::Config;
use crate::db::UserDirectory;
use crate::login::LoginService;
use crate::oauth::TokenExchangeClient;
use crate::transport::ResilientTransport;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub login: Arc<LoginService>,
}

impl AppState {
    /// Build the state from configuration. `users` is `None` when no
    /// database is configured.
    pub fn new(config: &Config, users: Option<Arc<dyn UserDirectory>>) -> Result<Self, String> {
        let transport = ResilientTransport::new(config.retry)
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        let exchange = TokenExchangeClient::new(&config.oauth, Arc::new(transport));
        Ok(Self {
            login: Arc::new(LoginService::new(exchange, users)),
        })
    }
}
