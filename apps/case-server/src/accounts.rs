// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account registration and login.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{CredentialError, CredentialService};
use crate::models::{User, UserProfile};
use crate::storage::{CaseStore, StorageError};
use crate::validation::{Credentials, Registration};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("username already exists")]
    UsernameTaken,

    /// Unknown user and wrong password are deliberately the same error.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AccountError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Conflict(_) => AccountError::UsernameTaken,
            other => AccountError::Storage(other),
        }
    }
}

/// A freshly issued credential and the profile it belongs to.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CaseStore>,
    credentials: Arc<CredentialService>,
}

impl AccountService {
    pub fn new(store: Arc<dyn CaseStore>, credentials: Arc<CredentialService>) -> Self {
        Self { store, credentials }
    }

    /// Create an account and sign the new user in.
    ///
    /// Uniqueness is enforced by the store's atomic insert, so two concurrent
    /// registrations for one username yield exactly one account.
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AccountError> {
        let Registration {
            username,
            password,
            phone,
        } = registration;

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?
            .map_err(|e| AccountError::Hashing(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            phone,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;

        let token = self.credentials.issue(&user.id, &user.username)?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(AuthSession {
            token,
            user: UserProfile::from(&user),
        })
    }

    pub async fn login(&self, credentials: Credentials) -> Result<AuthSession, AccountError> {
        let Credentials { username, password } = credentials;

        let user = self
            .store
            .get_user_by_username(&username)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let stored_hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AccountError::Hashing(e.to_string()))?;
        if !valid {
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.credentials.issue(&user.id, &user.username)?;
        info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(AuthSession {
            token,
            user: UserProfile::from(&user),
        })
    }
}
