// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable storage of users and cases behind one logical contract,
//! [`CaseStore`], with two interchangeable backends chosen at startup:
//!
//! | `DATABASE_TYPE` | Backend | Model |
//! |-----------------|---------|-------|
//! | `sqlite` | [`SqliteStore`] | relational, single writer, unique index |
//! | `redb` | [`RedbStore`] | key-partitioned by owner, conditional writes |
//!
//! ## Backend Differences
//!
//! - **Username uniqueness**: unique index (sqlite) vs. check-and-insert
//!   inside one serialized write transaction (redb). Both are atomic.
//! - **Reference numbers**: count-based and monotonic (sqlite) vs.
//!   time-derived and not guaranteed unique (redb). See [`reference`].
//! - **Status updates**: both address a case by [`CaseKey`], which carries
//!   the owner partition key alongside the case id.
//!
//! Both produce identical [`CaseSummary`] shapes; business logic never
//! branches on the backend in use.

#[cfg(test)]
pub(crate) mod conformance;
pub mod error;
pub mod keyvalue;
pub mod reference;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{DatabaseKind, StorageConfig};
use crate::models::{Case, CaseKey, CaseSummary, SmsStatus, User};

pub use error::{StorageError, StorageResult};
pub use keyvalue::RedbStore;
pub use sqlite::SqliteStore;

/// Logical storage contract shared by every backend.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Insert a new user. Fails with [`StorageError::Conflict`] when the
    /// username is taken; the check and the write are a single atomic step.
    async fn insert_user(&self, user: &User) -> StorageResult<()>;

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    async fn get_user_by_id(&self, id: &str) -> StorageResult<Option<User>>;

    /// Produce a `CASE-<year>-<NNNN>` reference for the next case.
    async fn allocate_reference_number(&self) -> StorageResult<String>;

    /// Persist a case. The case is expected to carry `SmsStatus::Pending`.
    async fn insert_case(&self, case: &Case) -> StorageResult<()>;

    /// Move a pending case to a terminal SMS status.
    ///
    /// Fails with [`StorageError::InvalidTransition`] if `status` is not
    /// terminal or the case already left `PENDING`.
    async fn update_sms_status(&self, key: &CaseKey, status: SmsStatus) -> StorageResult<()>;

    /// Cases owned by `user_id`, newest first.
    async fn list_cases_by_user_id(&self, user_id: &str) -> StorageResult<Vec<CaseSummary>>;

    /// Cheap probe used by the readiness endpoint.
    async fn health_check(&self) -> StorageResult<()>;
}

/// Open the backend selected by configuration.
pub fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn CaseStore>> {
    let store: Arc<dyn CaseStore> = match config.kind {
        DatabaseKind::Sqlite => Arc::new(SqliteStore::open(&config.sqlite_path)?),
        DatabaseKind::Redb => Arc::new(RedbStore::open(&config.redb_path)?),
    };

    info!(backend = store.backend(), "Storage backend ready");
    Ok(store)
}

/// Reject non-terminal targets before touching a backend.
pub(crate) fn ensure_terminal(key: &CaseKey, status: SmsStatus) -> StorageResult<()> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(StorageError::InvalidTransition(format!(
            "case {} cannot be moved back to {status}",
            key.case_id
        )))
    }
}
