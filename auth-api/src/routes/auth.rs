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

//! Handler for the authorization-code login endpoint.

use auth_types::{
    responses::{APIResponse, LoginResponse},
    LoginRequest,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/v1/auth/login
///
/// Dropping the handler future (client disconnect) cancels any in-flight
/// exchange or pending retry.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<APIResponse<LoginResponse>>, AppError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!("rejected login body: {rejection}");
        AppError::bad_request()
    })?;

    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::bad_request());
    }

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = state.login.login(request.provider, code, &cancel).await?;

    Ok(Json(APIResponse::ok(LoginResponse {
        message: "Login succeeded".to_string(),
        tokens: outcome.tokens.into(),
        user: outcome.claims.into(),
    })))
}
