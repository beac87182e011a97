// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential claims and authenticated user representation.

use serde::{Deserialize, Serialize};

/// Claims carried by an issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialClaims {
    pub user_id: String,
    pub username: String,
    /// Issued at (seconds since the epoch)
    pub iat: i64,
    /// Expiration (seconds since the epoch)
    pub exp: i64,
}

/// Caller identity resolved from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
}

impl From<CredentialClaims> for AuthenticatedUser {
    fn from(claims: CredentialClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}
