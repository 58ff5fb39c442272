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

//! Application error type that implements Axum's `IntoResponse`.
//!
//! Every error is returned as `APIResponse<APIError>` with `success: false`,
//! paired with the appropriate HTTP status code. Only a stable code and a
//! generic message are sent; internal causes stay in the logs.

use auth_types::{APIError, APIResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::oauth::{AuthError, AuthErrorKind};

/// Application-level error that pairs an HTTP status code with an [`APIError`].
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: APIError,
}

impl AppError {
    pub fn new(status: StatusCode, body: APIError) -> Self {
        Self { status, body }
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, APIError::bad_request())
    }

    pub fn identity_retrieval_failed() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            APIError::identity_retrieval_failed(),
        )
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, APIError::internal_error())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = APIResponse::error(self.body);
        (self.status, Json(body)).into_response()
    }
}

impl From<&AuthError> for AppError {
    fn from(err: &AuthError) -> Self {
        match err.kind {
            AuthErrorKind::Config => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                APIError::configuration_error(),
            ),
            AuthErrorKind::Security => {
                Self::new(StatusCode::BAD_REQUEST, APIError::invalid_redirect_origin())
            }
            AuthErrorKind::Network | AuthErrorKind::Server => Self::new(
                StatusCode::UNAUTHORIZED,
                APIError::auth_service_unavailable(),
            ),
            AuthErrorKind::Client => Self::new(
                StatusCode::UNAUTHORIZED,
                APIError::invalid_authorization_code(),
            ),
            AuthErrorKind::Validation
            | AuthErrorKind::Request
            | AuthErrorKind::Parse
            | AuthErrorKind::Format => {
                Self::new(StatusCode::UNAUTHORIZED, APIError::authentication_failed())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {err}");
        Self::internal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    /// Consume the response body and return it as raw JSON.
    async fn read_error_body(resp: Response) -> (StatusCode, serde_json::Value) {
        let status = resp.status();
        let bytes = Body::new(resp.into_body())
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let parsed: serde_json::Value =
            serde_json::from_slice(&bytes).expect("deserialize error body");
        (status, parsed)
    }

    fn mapped(kind: AuthErrorKind) -> AppError {
        AppError::from(AuthError::new(kind, "secret internal detail"))
    }

    #[tokio::test]
    async fn error_body_has_success_code_and_message_only() {
        let resp = mapped(AuthErrorKind::Client).into_response();
        let (status, body) = read_error_body(resp).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_AUTHORIZATION_CODE");
        assert!(body["message"].is_string());
        assert_eq!(body.as_object().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn internal_detail_never_reaches_the_body() {
        let resp = mapped(AuthErrorKind::Parse).into_response();
        let (_, body) = read_error_body(resp).await;
        assert!(!body.to_string().contains("secret internal detail"));
    }

    #[test]
    fn config_errors_are_500() {
        let err = mapped(AuthErrorKind::Config);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "CONFIGURATION_ERROR");
    }

    #[test]
    fn security_errors_are_400() {
        let err = mapped(AuthErrorKind::Security);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.code, "INVALID_REDIRECT_ORIGIN");
    }

    #[test]
    fn upstream_outages_are_401_unavailable() {
        for kind in [AuthErrorKind::Network, AuthErrorKind::Server] {
            let err = mapped(kind);
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
            assert_eq!(err.body.code, "AUTH_SERVICE_UNAVAILABLE");
        }
    }

    #[test]
    fn bad_tokens_are_401_authentication_failed() {
        for kind in [
            AuthErrorKind::Validation,
            AuthErrorKind::Request,
            AuthErrorKind::Parse,
            AuthErrorKind::Format,
        ] {
            let err = mapped(kind);
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
            assert_eq!(err.body.code, "AUTHENTICATION_FAILED");
        }
    }

    #[test]
    fn database_errors_are_internal() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.code, "INTERNAL_SERVER_ERROR");
    }
}
