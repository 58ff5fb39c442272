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

//! Response types for the login REST API.
//!
//! Login responses use an [`APIResponse<T>`] envelope whose payload fields are
//! flattened next to `success`:
//! - On success: `{ "success": true,  "message": ..., "tokens": ..., "user": ... }`
//! - On failure: `{ "success": false, "message": ..., "code": ... }`

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Generic envelope
// ---------------------------------------------------------------------------

/// Top-level API response envelope.
///
/// # Success example
///
/// ```json
/// { "success": true, "message": "Login succeeded", "tokens": { ... }, "user": { ... } }
/// ```
///
/// # Error example
///
/// ```json
/// { "success": false, "code": "AUTHENTICATION_FAILED", "message": "Authentication failed." }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct APIResponse<A: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub result: A,
}

impl<A: Serialize> APIResponse<A> {
    /// Wrap a successful result.
    pub fn ok(result: A) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

impl APIResponse<crate::error::APIError> {
    /// Wrap an error result.
    pub fn error(err: crate::error::APIError) -> Self {
        Self {
            success: false,
            result: err,
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint-specific response payloads
// ---------------------------------------------------------------------------

/// Tokens issued by the identity service, returned verbatim to the caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Normalized identity of the signed-in user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub email: String,
    pub username: String,
    pub name: String,
    pub picture: String,
    pub sub: String,
}

/// Response payload for `POST /api/v1/auth/login` (200 OK).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginResponse {
    pub message: String,
    pub tokens: TokenSet,
    pub user: UserInfo,
}

/// Response payload for `GET /api/v1/health`. Not wrapped in the envelope.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}
