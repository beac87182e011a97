// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message returned for every rejected credential.
pub const UNAUTHENTICATED_MESSAGE: &str = "Invalid or expired token";

/// Why a request failed authentication.
///
/// The variants only exist for logs. Clients always see the same 401 body.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Signature, expiry or structure check failed
    InvalidToken,
}

#[derive(Serialize)]
struct AuthErrorBody {
    message: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::InvalidToken => write!(f, "Token failed verification"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(error_code = self.error_code(), "Rejected request: {self}");
        let body = Json(AuthErrorBody {
            message: UNAUTHENTICATED_MESSAGE,
        });
        (self.status_code(), body).into_response()
    }
}
