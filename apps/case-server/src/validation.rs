// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request payload validation.
//!
//! Turns the raw request bodies from [`crate::models`] into validated
//! records, or a [`ValidationError`] listing every failing field in field
//! order. Lengths are counted in characters, not bytes.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::models::{CreateCaseRequest, LoginRequest, RegisterRequest};
use crate::phone::is_e164;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 100;
const TITLE_MIN: usize = 10;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MIN: usize = 10;
const DESCRIPTION_MAX: usize = 1000;

/// Message for a credential field that is absent or not a string.
pub const INVALID_INPUT: &str = "Invalid input";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// One or more fields failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message of the first failing field.
    pub fn summary(&self) -> &str {
        self.errors
            .first()
            .map(|e| e.message.as_str())
            .unwrap_or(INVALID_INPUT)
    }

    /// `{"fieldErrors": {field: [message, ...]}}`
    pub fn details(&self) -> Value {
        let mut fields: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for error in &self.errors {
            fields.entry(error.field).or_default().push(&error.message);
        }
        json!({ "fieldErrors": fields })
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.summary())
    }
}

impl std::error::Error for ValidationError {}

/// Collects field errors while checking a payload.
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Presence and character-length check. Returns the value only when it passed.
    fn length(
        &mut self,
        field: &'static str,
        value: Option<String>,
        bounds: (usize, usize),
        missing: &str,
        too_short: &str,
        too_long: &str,
    ) -> Option<String> {
        let Some(value) = value else {
            self.fail(field, missing);
            return None;
        };
        let len = value.chars().count();
        if len < bounds.0 {
            self.fail(field, too_short);
            None
        } else if len > bounds.1 {
            self.fail(field, too_long);
            None
        } else {
            Some(value)
        }
    }

    fn phone(&mut self, value: Option<String>, message: &str) -> Option<String> {
        match value {
            Some(phone) if is_e164(&phone) => Some(phone),
            Some(_) => {
                self.fail("phone", message);
                None
            }
            None => None,
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(ValidationError {
                errors: self.errors,
            }),
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// A validated registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Validated login credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn check_credentials(
    checker: &mut Checker,
    username: Option<String>,
    password: Option<String>,
) -> Option<Credentials> {
    let username = checker.length(
        "username",
        username,
        (USERNAME_MIN, USERNAME_MAX),
        INVALID_INPUT,
        "Username must be at least 3 characters",
        "Username must be at most 50 characters",
    );
    let password = checker.length(
        "password",
        password,
        (PASSWORD_MIN, PASSWORD_MAX),
        INVALID_INPUT,
        "Password must be at least 6 characters",
        "Password must be at most 100 characters",
    );
    Some(Credentials {
        username: username?,
        password: password?,
    })
}

pub fn validate_registration(request: RegisterRequest) -> Result<Registration, ValidationError> {
    let mut checker = Checker::default();
    let credentials = check_credentials(&mut checker, request.username, request.password);
    let phone = checker.phone(
        request.phone,
        "Phone must be in E.164 format (e.g., +6591234567)",
    );

    let registration = credentials.map(|c| Registration {
        username: c.username,
        password: c.password,
        phone,
    });
    checker.finish(registration)
}

pub fn validate_login(request: LoginRequest) -> Result<Credentials, ValidationError> {
    let mut checker = Checker::default();
    let credentials = check_credentials(&mut checker, request.username, request.password);
    checker.finish(credentials)
}

// =============================================================================
// Cases
// =============================================================================

/// A validated case submission. `phone` is `None` when the caller omitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDraft {
    pub title: String,
    pub description: String,
    pub phone: Option<String>,
}

pub fn validate_case(request: CreateCaseRequest) -> Result<CaseDraft, ValidationError> {
    let mut checker = Checker::default();
    let title = checker.length(
        "title",
        request.title,
        (TITLE_MIN, TITLE_MAX),
        "Title is required",
        "Title must be at least 10 characters",
        "Title too long",
    );
    let description = checker.length(
        "description",
        request.description,
        (DESCRIPTION_MIN, DESCRIPTION_MAX),
        "Description is required",
        "Description must be at least 10 characters",
        "Description too long",
    );
    let phone = checker.phone(request.phone, "Phone must be in E.164 format");

    let draft = title.zip(description).map(|(title, description)| CaseDraft {
        title,
        description,
        phone,
    });
    checker.finish(draft)
}
