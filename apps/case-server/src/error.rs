// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::accounts::AccountError;
use crate::cases::SubmissionError;
use crate::storage::StorageError;
use crate::validation::{ValidationError, INVALID_INPUT};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const INVALID_PAYLOAD_MESSAGE: &str = "Invalid request payload";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Generic 500. The cause is logged, never returned.
    pub fn internal(cause: &dyn std::error::Error) -> Self {
        error!(error = %cause, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// Credential form errors: the first field's message, no details.
    pub fn from_form(error: ValidationError) -> Self {
        Self::bad_request(error.summary())
    }

    /// Body rejections on the credential forms. A body that parsed as JSON
    /// but has a wrongly typed field is reported like a missing field.
    pub fn from_form_rejection(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                tracing::debug!(error = %e.body_text(), "Rejected credential form");
                Self::bad_request(INVALID_INPUT)
            }
            other => Self::from(other),
        }
    }

    /// Case payload errors: generic message with per-field details.
    pub fn from_payload(error: ValidationError) -> Self {
        Self::bad_request(INVALID_PAYLOAD_MESSAGE).with_details(error.details())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Request payload too large");
        }
        Self::bad_request(INVALID_PAYLOAD_MESSAGE)
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::UsernameTaken => Self::conflict("Username already exists"),
            AccountError::InvalidCredentials => Self::unauthorized("Invalid username or password"),
            other => Self::internal(&other),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(error: SubmissionError) -> Self {
        match error {
            SubmissionError::PhoneRequired => Self::bad_request("Phone number is required"),
            other => Self::internal(&other),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        Self::internal(&error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            message: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}
