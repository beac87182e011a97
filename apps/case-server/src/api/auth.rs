// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    accounts::AuthSession,
    error::ApiError,
    models::{LoginRequest, RegisterRequest, UserProfile},
    state::AppState,
    validation::{validate_login, validate_registration},
};

/// Issued credential plus the caller's profile.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
    pub message: String,
}

impl AuthResponse {
    fn new(session: AuthSession, message: &str) -> Self {
        Self {
            token: session.token,
            user: session.user,
            message: message.to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload.map_err(ApiError::from_form_rejection)?;
    let registration = validate_registration(request).map_err(ApiError::from_form)?;
    let session = state.accounts.register(registration).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(session, "User registered successfully")),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::from_form_rejection)?;
    let credentials = validate_login(request).map_err(ApiError::from_form)?;
    let session = state.accounts.login(credentials).await?;
    Ok(Json(AuthResponse::new(session, "Login successful")))
}
