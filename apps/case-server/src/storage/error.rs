// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage errors shared by both backends.

/// Error type for storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write (duplicate username).
    #[error("already exists: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The SMS status is already terminal, or the target is not terminal.
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("redb error: {0}")]
    Redb(String),

    /// Anything else: poisoned locks, failed blocking tasks, bad rows.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

macro_rules! redb_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StorageError {
                fn from(e: $ty) -> Self {
                    StorageError::Redb(e.to_string())
                }
            }
        )*
    };
}

redb_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        StorageError::Backend(format!("blocking storage task failed: {e}"))
    }
}
