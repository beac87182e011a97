// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain and API Data Models
//!
//! This module defines the records owned by the storage backends (users and
//! cases) together with the request and response bodies of the REST API.
//! Response types derive `Serialize` and `ToSchema` for JSON handling and
//! OpenAPI documentation; field names on the wire are camelCase.
//!
//! ## Model Categories
//!
//! - **Users**: registered accounts (the password hash never leaves storage)
//! - **Cases**: submitted cases and the list summaries derived from them
//! - **Requests**: raw, unvalidated request bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Status Types
// =============================================================================

/// Delivery state of the SMS sent for a case.
///
/// Starts at `PENDING` and moves exactly once to `SENT` or `FAILED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmsStatus {
    Pending,
    Sent,
    Failed,
}

impl SmsStatus {
    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsStatus::Pending => "PENDING",
            SmsStatus::Sent => "SENT",
            SmsStatus::Failed => "FAILED",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(SmsStatus::Pending),
            "SENT" => Some(SmsStatus::Sent),
            "FAILED" => Some(SmsStatus::Failed),
            _ => None,
        }
    }

    /// Whether the notification attempt has completed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SmsStatus::Pending)
    }
}

impl std::fmt::Display for SmsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case workflow status. Cases never leave `SUBMITTED`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    #[default]
    Submitted,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Submitted => "SUBMITTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUBMITTED" => Some(CaseStatus::Submitted),
            _ => None,
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered account as held by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Opaque unique identifier (UUID).
    pub id: String,
    /// Unique login name, 3 to 50 characters.
    pub username: String,
    /// Argon2 PHC string. Never serialized into a response.
    pub password_hash: String,
    /// Optional E.164 number used when a case omits one.
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub phone: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            phone: user.phone.clone(),
        }
    }
}

// =============================================================================
// Cases
// =============================================================================

/// Key that locates a case in every backend.
///
/// The owner id doubles as the partition key of the key-partitioned store,
/// so it travels with the case id wherever a case is addressed directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseKey {
    pub user_id: String,
    pub case_id: String,
}

/// A submitted case as held by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub id: String,
    /// Human-facing identifier, `CASE-<year>-<sequence>`.
    pub reference_number: String,
    /// Owning user.
    pub user_id: String,
    pub title: String,
    pub description: String,
    /// E.164 number that was notified.
    pub phone: String,
    pub status: CaseStatus,
    pub sms_status: SmsStatus,
    /// Name of the SMS provider active when the case was created.
    pub sms_provider: String,
    pub created_at: DateTime<Utc>,
}

impl Case {
    pub fn key(&self) -> CaseKey {
        CaseKey {
            user_id: self.user_id.clone(),
            case_id: self.id.clone(),
        }
    }
}

/// List view of a case. Carries no phone, description or owner id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: String,
    pub reference_number: String,
    pub title: String,
    pub status: CaseStatus,
    pub sms_status: SmsStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Case> for CaseSummary {
    fn from(case: &Case) -> Self {
        Self {
            id: case.id.clone(),
            reference_number: case.reference_number.clone(),
            title: case.title.clone(),
            status: case.status,
            sms_status: case.sms_status,
            created_at: case.created_at,
        }
    }
}

// =============================================================================
// Request Models
// =============================================================================

/// Request to register a new account.
///
/// Fields are optional at the deserialization layer so that a missing
/// field surfaces as a validation message rather than a JSON error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// 3 to 50 characters.
    pub username: Option<String>,
    /// 6 to 100 characters.
    pub password: Option<String>,
    /// Optional E.164 phone number.
    pub phone: Option<String>,
}

/// Request to log in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Request to submit a case. Unknown fields are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCaseRequest {
    /// 10 to 100 characters.
    pub title: Option<String>,
    /// 10 to 1000 characters.
    pub description: Option<String>,
    /// E.164 number to notify. Falls back to the caller's profile phone.
    pub phone: Option<String>,
}
