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

//! API error types.
//!
//! Every failed API response is returned as `APIResponse<APIError>` with `success: false`.

use serde::{Deserialize, Serialize};

/// Structured error flattened into a failed [`super::APIResponse`].
///
/// The `code` field is a machine-readable identifier (e.g. `"AUTHENTICATION_FAILED"`).
/// The `message` field is a generic, human-readable description suitable for display.
/// Internal causes never travel in this type; they are logged server-side only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct APIError {
    /// Machine-readable error code.
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

impl APIError {
    fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new("BAD_REQUEST", "Invalid request.")
    }

    pub fn configuration_error() -> Self {
        Self::new(
            "CONFIGURATION_ERROR",
            "The authentication service is not configured correctly.",
        )
    }

    pub fn invalid_redirect_origin() -> Self {
        Self::new("INVALID_REDIRECT_ORIGIN", "The login request was rejected.")
    }

    pub fn auth_service_unavailable() -> Self {
        Self::new(
            "AUTH_SERVICE_UNAVAILABLE",
            "The authentication service is temporarily unavailable. Please try again later.",
        )
    }

    pub fn invalid_authorization_code() -> Self {
        Self::new(
            "INVALID_AUTHORIZATION_CODE",
            "The authorization code is invalid or has expired.",
        )
    }

    pub fn authentication_failed() -> Self {
        Self::new("AUTHENTICATION_FAILED", "Authentication failed.")
    }

    pub fn identity_retrieval_failed() -> Self {
        Self::new(
            "IDENTITY_RETRIEVAL_FAILED",
            "Failed to retrieve user identity.",
        )
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_SERVER_ERROR", "Internal server error.")
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for APIError {}
