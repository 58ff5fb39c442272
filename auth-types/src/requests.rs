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

//! Request types for the login REST API.
//!
//! These types define the shape of request bodies.
//! They are used by both the server (for deserialization) and clients
//! (for serialization).

use serde::{Deserialize, Serialize};

/// Upstream social identity provider the user signed in with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
    Facebook,
}

impl Provider {
    /// Lowercase wire name, also used as the persistence key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
            Provider::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    /// Provider the authorization code was issued for.
    pub provider: Provider,

    /// One-time authorization code returned to the frontend callback.
    pub code: String,

    /// Opaque CSRF state echoed by the provider. Accepted but not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
