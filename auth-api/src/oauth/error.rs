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

//! Tagged error for the token exchange and claim extraction steps.

use std::fmt;

use thiserror::Error;

use super::claims::ClaimsError;

/// Category of an [`AuthError`]. Drives retriability and the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Missing or invalid local configuration.
    Config,
    /// The identity service could not be reached.
    Network,
    /// The identity service answered `4xx`.
    Client,
    /// The identity service answered `5xx`.
    Server,
    /// A configured value failed a security check (redirect allow-list).
    Security,
    /// A well-formed response carried unusable values.
    Validation,
    /// The outbound request could not be built, or an unexpected status came back.
    Request,
    /// A response or token payload could not be decoded.
    Parse,
    /// A token did not have the expected structure.
    Format,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::Config => "config_error",
            AuthErrorKind::Network => "network_error",
            AuthErrorKind::Client => "client_error",
            AuthErrorKind::Server => "server_error",
            AuthErrorKind::Security => "security_error",
            AuthErrorKind::Validation => "validation_error",
            AuthErrorKind::Request => "request_error",
            AuthErrorKind::Parse => "parse_error",
            AuthErrorKind::Format => "format_error",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced while exchanging an authorization code or reading an ID token.
///
/// The `message` is internal and may be logged; it is never sent to clients.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    /// Upstream HTTP status, when the error came from a response.
    pub http_status: Option<u16>,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_status(kind: AuthErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status: Some(status),
            ..Self::new(kind, message)
        }
    }

    pub fn with_cause<E>(kind: AuthErrorKind, message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(kind, message)
        }
    }

    /// Whether repeating the operation may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, AuthErrorKind::Network | AuthErrorKind::Server)
    }

    /// Classify a non-success status from the token endpoint.
    pub fn from_status(status: u16) -> Self {
        let kind = match status {
            400..=499 => AuthErrorKind::Client,
            500..=599 => AuthErrorKind::Server,
            _ => AuthErrorKind::Request,
        };
        Self::with_status(kind, status, format!("identity service returned HTTP {status}"))
    }
}

impl From<ClaimsError> for AuthError {
    fn from(err: ClaimsError) -> Self {
        let kind = match &err {
            ClaimsError::InvalidSentinel | ClaimsError::MissingIdentity => {
                AuthErrorKind::Validation
            }
            ClaimsError::Format { .. } => AuthErrorKind::Format,
            ClaimsError::Decode(_) | ClaimsError::Parse(_) => AuthErrorKind::Parse,
        };
        AuthError::with_cause(kind, "invalid ID token", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ranges_are_classified() {
        assert_eq!(AuthError::from_status(400).kind, AuthErrorKind::Client);
        assert_eq!(AuthError::from_status(404).kind, AuthErrorKind::Client);
        assert_eq!(AuthError::from_status(500).kind, AuthErrorKind::Server);
        assert_eq!(AuthError::from_status(503).kind, AuthErrorKind::Server);
        assert_eq!(AuthError::from_status(302).kind, AuthErrorKind::Request);
        assert_eq!(AuthError::from_status(201).kind, AuthErrorKind::Request);
        assert_eq!(AuthError::from_status(404).http_status, Some(404));
    }

    #[test]
    fn only_network_and_server_are_retriable() {
        assert!(AuthError::new(AuthErrorKind::Network, "x").is_retriable());
        assert!(AuthError::from_status(502).is_retriable());
        assert!(!AuthError::from_status(401).is_retriable());
        for kind in [
            AuthErrorKind::Config,
            AuthErrorKind::Security,
            AuthErrorKind::Validation,
            AuthErrorKind::Request,
            AuthErrorKind::Parse,
            AuthErrorKind::Format,
        ] {
            assert!(!AuthError::new(kind, "x").is_retriable(), "{kind}");
        }
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = AuthError::new(AuthErrorKind::Security, "origin not allowed");
        assert_eq!(err.to_string(), "security_error: origin not allowed");
    }

    #[test]
    fn claims_errors_keep_their_cause() {
        use std::error::Error as _;
        let err = AuthError::from(ClaimsError::Format { segments: 2 });
        assert_eq!(err.kind, AuthErrorKind::Format);
        assert!(err.source().is_some());
        assert_eq!(
            AuthError::from(ClaimsError::InvalidSentinel).kind,
            AuthErrorKind::Validation
        );
        assert_eq!(
            AuthError::from(ClaimsError::MissingIdentity).kind,
            AuthErrorKind::Validation
        );
    }
}
