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

//! Authorization code → token exchange against the identity service.

use std::sync::Arc;

use auth_types::responses::TokenSet;
use auth_types::Provider;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::OAuthConfig;
use crate::mask::mask_secret;
use crate::transport::{ResilientTransport, TransportError};

use super::error::{AuthError, AuthErrorKind};

/// An identity domain containing this marker is a development placeholder:
/// no network call is made and [`AuthTokens::mock`] is returned.
pub const MOCK_DOMAIN_MARKER: &str = "dummy-domain";

/// Path appended to the frontend base URL to form the redirect URI.
pub const CALLBACK_PATH: &str = "/auth/callback";

const MAX_ERROR_BODY_BYTES: usize = 4096;
const MAX_ERROR_CODE_CHARS: usize = 64;

/// Tokens returned by a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    /// Access token lifetime in seconds. Always positive.
    pub expires_in: i64,
}

impl AuthTokens {
    /// Fixed token set returned for a placeholder identity domain.
    pub fn mock() -> Self {
        Self {
            access_token: "mock_access_token".to_string(),
            refresh_token: "mock_refresh_token".to_string(),
            id_token: super::claims::MOCK_ID_TOKEN.to_string(),
            expires_in: 3600,
        }
    }
}

impl From<AuthTokens> for TokenSet {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            expires_in: tokens.expires_in,
        }
    }
}

/// Raw response from the token endpoint. Missing fields decode as empty so
/// that they are reported by validation rather than as parse failures.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl TokenEndpointResponse {
    fn validate(self) -> Result<AuthTokens, AuthError> {
        if self.access_token.is_empty() {
            return Err(AuthError::new(
                AuthErrorKind::Validation,
                "access token is empty",
            ));
        }
        if self.id_token.is_empty() {
            return Err(AuthError::new(AuthErrorKind::Validation, "ID token is empty"));
        }
        if self.expires_in <= 0 {
            return Err(AuthError::new(
                AuthErrorKind::Validation,
                format!("invalid expires_in: {}", self.expires_in),
            ));
        }
        Ok(AuthTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            expires_in: self.expires_in,
        })
    }
}

/// Exchanges authorization codes at `{identity_domain}/oauth2/token`.
pub struct TokenExchangeClient {
    config: OAuthConfig,
    transport: Arc<ResilientTransport>,
}

impl TokenExchangeClient {
    pub fn new(config: &OAuthConfig, transport: Arc<ResilientTransport>) -> Self {
        Self {
            config: config.clone(),
            transport,
        }
    }

    fn is_mock_domain(&self) -> bool {
        self.config.identity_domain.contains(MOCK_DOMAIN_MARKER)
    }

    fn token_url(&self) -> String {
        format!(
            "{}/oauth2/token",
            self.config.identity_domain.trim_end_matches('/')
        )
    }

    /// Build the redirect URI from the configured frontend URL.
    ///
    /// The frontend URL must be present and must exactly match an entry of the
    /// origin allow-list; otherwise the authorization code could be bound to
    /// an attacker-controlled redirect.
    pub fn redirect_uri(&self) -> Result<String, AuthError> {
        let frontend = self
            .config
            .frontend_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AuthError::new(AuthErrorKind::Config, "frontend URL (FE_URL) is not configured")
            })?;

        if !self.config.allowed_origins.iter().any(|o| o == frontend) {
            return Err(AuthError::new(
                AuthErrorKind::Security,
                format!("frontend URL {frontend} is not in the allowed origins"),
            ));
        }

        let mut url = Url::parse(frontend).map_err(|e| {
            AuthError::with_cause(AuthErrorKind::Config, "frontend URL is not a valid URL", e)
        })?;
        let path = format!("{}{CALLBACK_PATH}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url.to_string())
    }

    /// Exchange `code` for tokens.
    ///
    /// Transient failures are retried by the transport; a `200` response is
    /// still rejected when it lacks an access token or ID token, or carries a
    /// non-positive `expires_in`.
    pub async fn exchange(
        &self,
        code: &str,
        provider: Provider,
        cancel: &CancellationToken,
    ) -> Result<AuthTokens, AuthError> {
        if self.is_mock_domain() {
            tracing::warn!(
                provider = %provider,
                "identity domain is a development placeholder, returning mock tokens"
            );
            return Ok(AuthTokens::mock());
        }

        let redirect_uri = self.redirect_uri()?;
        let token_url = self.token_url();

        tracing::debug!(
            url = %token_url,
            provider = %provider,
            code = %mask_secret(code),
            client_id = %self.config.client_id,
            "starting token exchange"
        );

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let request = self
            .transport
            .post(&token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&params)
            .build()
            .map_err(|e| {
                AuthError::with_cause(AuthErrorKind::Request, "failed to build token request", e)
            })?;

        let response = match self.transport.execute_with_retry(request, cancel).await {
            Ok(response) => response,
            Err(TransportError::Status { status }) => {
                return Err(AuthError::from_status(status.as_u16()))
            }
            Err(err) => {
                return Err(AuthError::with_cause(
                    AuthErrorKind::Network,
                    "token endpoint unreachable",
                    err,
                ))
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let oauth_error = upstream_error_code(response).await;
            tracing::error!(
                status = status.as_u16(),
                error = oauth_error.as_deref().unwrap_or("-"),
                "token endpoint rejected the exchange"
            );
            return Err(AuthError::from_status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AuthError::with_cause(AuthErrorKind::Parse, "failed to read token response", e)
        })?;
        let raw: TokenEndpointResponse = serde_json::from_slice(&bytes).map_err(|e| {
            AuthError::with_cause(AuthErrorKind::Parse, "failed to parse token response", e)
        })?;
        let tokens = raw.validate()?;

        tracing::info!(
            provider = %provider,
            client_id = %self.config.client_id,
            access_token = %mask_secret(&tokens.access_token),
            expires_in = tokens.expires_in,
            "token exchange succeeded"
        );

        Ok(tokens)
    }
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of an error response and return its
/// OAuth `error` code. The rest of the body is never logged.
async fn upstream_error_code(mut response: Response) -> Option<String> {
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        let room = MAX_ERROR_BODY_BYTES - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= MAX_ERROR_BODY_BYTES {
            break;
        }
    }
    oauth_error_code(&body)
}

fn oauth_error_code(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct OAuthErrorBody {
        error: String,
    }

    let parsed: OAuthErrorBody = serde_json::from_slice(body).ok()?;
    let code: String = parsed.error.chars().take(MAX_ERROR_CODE_CHARS).collect();
    (!code.is_empty()).then_some(code)
}
