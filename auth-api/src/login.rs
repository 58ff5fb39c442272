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

//! Login orchestration: code exchange, identity extraction, user hand-off.

use std::sync::Arc;

use auth_types::Provider;
use tokio_util::sync::CancellationToken;

use crate::db::UserDirectory;
use crate::error::AppError;
use crate::mask::{mask_email, mask_secret};
use crate::oauth::{extract_claims, AuthError, AuthTokens, IdentityClaims, TokenExchangeClient};

/// Tokens and identity produced by a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: AuthTokens,
    pub claims: IdentityClaims,
}

pub struct LoginService {
    exchange: TokenExchangeClient,
    users: Option<Arc<dyn UserDirectory>>,
}

impl LoginService {
    /// `users` is optional; without it the provisioning step is skipped.
    pub fn new(exchange: TokenExchangeClient, users: Option<Arc<dyn UserDirectory>>) -> Self {
        Self { exchange, users }
    }

    /// Complete an authorization-code login for `provider`.
    ///
    /// Errors are already mapped to user-safe [`AppError`]s; the internal
    /// cause is logged here and never returned.
    pub async fn login(
        &self,
        provider: Provider,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, AppError> {
        tracing::info!(provider = %provider, code = %mask_secret(code), "login started");

        let tokens = self
            .exchange
            .exchange(code, provider, cancel)
            .await
            .map_err(|err| {
                tracing::error!(
                    provider = %provider,
                    kind = %err.kind,
                    status = ?err.http_status,
                    "token exchange failed: {err}"
                );
                AppError::from(&err)
            })?;

        let claims = extract_claims(&tokens.id_token).map_err(|err| {
            let err = AuthError::from(err);
            tracing::error!(provider = %provider, kind = %err.kind, "identity extraction failed: {err}");
            AppError::identity_retrieval_failed()
        })?;

        tracing::info!(
            provider = %provider,
            sub = %mask_secret(&claims.subject),
            email = %mask_email(&claims.email),
            "identity extracted"
        );

        if let Some(users) = &self.users {
            let user = users.find_or_create(provider, &claims).await?;
            tracing::debug!(user_id = user.id, "user resolved");
        }

        Ok(LoginOutcome { tokens, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthConfig;
    use crate::db::UserRecord;
    use crate::transport::{ResilientTransport, RetryPolicy};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingDirectory {
        seen: Mutex<Vec<(Provider, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl UserDirectory for RecordingDirectory {
        async fn find_or_create(
            &self,
            provider: Provider,
            claims: &IdentityClaims,
        ) -> Result<UserRecord, sqlx::Error> {
            if self.fail {
                return Err(sqlx::Error::PoolTimedOut);
            }
            self.seen
                .lock()
                .unwrap()
                .push((provider, claims.subject.clone()));
            let now = chrono::Utc::now();
            Ok(UserRecord {
                id: 1,
                email: claims.email.clone(),
                username: claims.username.clone(),
                name: claims.name.clone(),
                picture: claims.picture.clone(),
                provider: provider.as_str().to_string(),
                subject_id: claims.subject.clone(),
                created_at: now,
                updated_at: now,
            })
        }
    }

    fn oauth_config(domain: &str) -> OAuthConfig {
        OAuthConfig {
            identity_domain: domain.to_string(),
            client_id: "client-123".to_string(),
            frontend_url: Some("http://localhost:3000".to_string()),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }

    fn service(domain: &str, users: Option<Arc<dyn UserDirectory>>) -> LoginService {
        let policy = RetryPolicy::new(
            Duration::from_secs(2),
            1,
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::ZERO,
        )
        .unwrap();
        let transport = Arc::new(ResilientTransport::new(policy).unwrap());
        LoginService::new(
            TokenExchangeClient::new(&oauth_config(domain), transport),
            users,
        )
    }

    #[tokio::test]
    async fn mock_domain_login_returns_stub_identity_and_provisions_user() {
        let directory = Arc::new(RecordingDirectory::default());
        let svc = service("https://dummy-domain.example", Some(directory.clone()));

        let outcome = svc
            .login(Provider::Google, "validcode", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.tokens, AuthTokens::mock());
        assert_eq!(outcome.claims, IdentityClaims::mock());
        assert_eq!(
            directory.seen.lock().unwrap().as_slice(),
            &[(Provider::Google, "mock-user-id-123".to_string())]
        );
    }

    #[tokio::test]
    async fn upstream_rejection_maps_to_invalid_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let err = service(&server.uri(), None)
            .login(Provider::Github, "expired-code", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body.code, "INVALID_AUTHORIZATION_CODE");
    }

    #[tokio::test]
    async fn undecodable_id_token_maps_to_identity_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-0123456789",
                "refresh_token": "rt-0123456789",
                "id_token": "dummy_id_token",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;

        let directory = Arc::new(RecordingDirectory::default());
        let err = service(&server.uri(), Some(directory.clone()))
            .login(Provider::Facebook, "good-code", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body.code, "IDENTITY_RETRIEVAL_FAILED");
        assert!(directory.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn directory_failure_is_internal() {
        let directory = Arc::new(RecordingDirectory {
            fail: true,
            ..Default::default()
        });
        let err = service("https://dummy-domain.example", Some(directory))
            .login(Provider::Google, "validcode", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "INTERNAL_SERVER_ERROR");
    }

    #[tokio::test]
    async fn identity_is_masked_in_logs() {
        let (logs, _guard) = crate::test_logs::capture();
        service("https://dummy-domain.example", None)
            .login(Provider::Google, "validcode", &CancellationToken::new())
            .await
            .unwrap();

        let output = logs.contents();
        assert_eq!(logs.count("identity extracted"), 1);
        assert!(output.contains(&format!("sub={}", mask_secret("mock-user-id-123"))));
        assert!(!output.contains("validcode"));
        assert!(!output.contains("mock-user-id-123"));
        assert!(!output.contains("test@example.com"));
    }
}
