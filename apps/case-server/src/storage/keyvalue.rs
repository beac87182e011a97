// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-partitioned backend on redb (pure Rust, ACID).
//!
//! Items are laid out the way a partitioned NoSQL table would hold them:
//! every case lives under its owner's partition, and the only secondary
//! index is the one for users by id.
//!
//! ## Table Layout
//!
//! - `users`: username → serialized [`UserItem`] (username is the partition key)
//! - `user_ids`: user id → username
//! - `cases`: `user_id|case_id` → serialized [`CaseItem`]
//! - `case_timeline`: `user_id|!created_at|case_id` → case id, for
//!   newest-first range scans within one partition
//!
//! A case can only be addressed with its owner id. There is no scan by case
//! id alone; callers pass a [`CaseKey`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::reference::time_derived_reference;
use super::{ensure_terminal, CaseStore, StorageError, StorageResult};
use crate::models::{Case, CaseKey, CaseStatus, CaseSummary, SmsStatus, User};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary user table: username → serialized UserItem (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Secondary index: user id → username.
const USER_IDS: TableDefinition<&str, &str> = TableDefinition::new("user_ids");

/// Primary case table: `user_id|case_id` → serialized CaseItem (JSON bytes).
const CASES: TableDefinition<&str, &[u8]> = TableDefinition::new("cases");

/// Ordering index: `user_id|inverted_timestamp_be|case_id` → case id.
const CASE_TIMELINE: TableDefinition<&[u8], &str> = TableDefinition::new("case_timeline");

// =============================================================================
// Stored Items
// =============================================================================

/// User item as persisted. Attribute names follow the item schema, not the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserItem {
    username: String,
    id: String,
    password_hash: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<&User> for UserItem {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            id: user.id.clone(),
            password_hash: user.password_hash.clone(),
            phone: user.phone.clone(),
            created_at: user.created_at,
        }
    }
}

impl From<UserItem> for User {
    fn from(item: UserItem) -> Self {
        Self {
            id: item.id,
            username: item.username,
            password_hash: item.password_hash,
            phone: item.phone,
            created_at: item.created_at,
        }
    }
}

/// Case item as persisted under the owner's partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CaseItem {
    user_id: String,
    id: String,
    reference_number: String,
    title: String,
    description: String,
    phone: String,
    status: CaseStatus,
    sms_status: SmsStatus,
    sms_provider: String,
    created_at: DateTime<Utc>,
}

impl From<&Case> for CaseItem {
    fn from(case: &Case) -> Self {
        Self {
            user_id: case.user_id.clone(),
            id: case.id.clone(),
            reference_number: case.reference_number.clone(),
            title: case.title.clone(),
            description: case.description.clone(),
            phone: case.phone.clone(),
            status: case.status,
            sms_status: case.sms_status,
            sms_provider: case.sms_provider.clone(),
            created_at: case.created_at,
        }
    }
}

impl From<&CaseItem> for CaseSummary {
    fn from(item: &CaseItem) -> Self {
        Self {
            id: item.id.clone(),
            reference_number: item.reference_number.clone(),
            title: item.title.clone(),
            status: item.status,
            sms_status: item.sms_status,
            created_at: item.created_at,
        }
    }
}

// =============================================================================
// Key Helpers
// =============================================================================

fn case_key(user_id: &str, case_id: &str) -> String {
    format!("{user_id}|{case_id}")
}

/// Build a timeline key: `user_id | inverted_timestamp_be_bytes | case_id`.
///
/// The inverted timestamp makes a forward scan return newest first.
fn make_timeline_key(user_id: &str, created_at: &DateTime<Utc>, case_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + 8 + 1 + case_id.len());
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!created_at.timestamp_micros() as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(case_id.as_bytes());
    key
}

fn make_partition_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.len() + 1);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a partition scan (prefix with 0xFF bytes appended).
fn make_partition_end(user_id: &str) -> Vec<u8> {
    let mut end = make_partition_prefix(user_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// RedbStore
// =============================================================================

/// redb-backed [`CaseStore`].
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Backend(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_IDS)?;
            let _ = write_txn.open_table(CASES)?;
            let _ = write_txn.open_table(CASE_TIMELINE)?;
        }
        write_txn.commit()?;

        info!(path = %path.display(), "redb database opened");
        Ok(Self { db: Arc::new(db) })
    }

    async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Database) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

fn read_user(db: &Database, username: &str) -> StorageResult<Option<User>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(USERS)?;
    match table.get(username)? {
        Some(value) => {
            let item: UserItem = serde_json::from_slice(value.value())?;
            Ok(Some(item.into()))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl CaseStore for RedbStore {
    fn backend(&self) -> &'static str {
        "redb"
    }

    async fn insert_user(&self, user: &User) -> StorageResult<()> {
        let item = UserItem::from(user);
        self.run(move |db| {
            let json = serde_json::to_vec(&item)?;

            // Write transactions are serialized, so the existence check and
            // the insert below behave as one conditional put.
            let write_txn = db.begin_write()?;
            {
                let mut users = write_txn.open_table(USERS)?;
                if users.get(item.username.as_str())?.is_some() {
                    return Err(StorageError::Conflict(format!("username {}", item.username)));
                }
                users.insert(item.username.as_str(), json.as_slice())?;

                let mut ids = write_txn.open_table(USER_IDS)?;
                ids.insert(item.id.as_str(), item.username.as_str())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let username = username.to_string();
        self.run(move |db| read_user(db, &username)).await
    }

    async fn get_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        let id = id.to_string();
        self.run(move |db| {
            let username = {
                let read_txn = db.begin_read()?;
                let ids = read_txn.open_table(USER_IDS)?;
                match ids.get(id.as_str())? {
                    Some(v) => v.value().to_string(),
                    None => return Ok(None),
                }
            };
            read_user(db, &username)
        })
        .await
    }

    async fn allocate_reference_number(&self) -> StorageResult<String> {
        // No global counter in a partitioned layout; see `reference`.
        let reference = time_derived_reference(Utc::now());
        debug!(reference = %reference, "Allocated time-derived reference number");
        Ok(reference)
    }

    async fn insert_case(&self, case: &Case) -> StorageResult<()> {
        let item = CaseItem::from(case);
        self.run(move |db| {
            let json = serde_json::to_vec(&item)?;
            let primary = case_key(&item.user_id, &item.id);
            let timeline = make_timeline_key(&item.user_id, &item.created_at, &item.id);

            let write_txn = db.begin_write()?;
            {
                let mut cases = write_txn.open_table(CASES)?;
                if cases.get(primary.as_str())?.is_some() {
                    return Err(StorageError::Conflict(format!("case {}", item.id)));
                }
                cases.insert(primary.as_str(), json.as_slice())?;

                let mut idx = write_txn.open_table(CASE_TIMELINE)?;
                idx.insert(timeline.as_slice(), item.id.as_str())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn update_sms_status(&self, key: &CaseKey, status: SmsStatus) -> StorageResult<()> {
        ensure_terminal(key, status)?;

        let key = key.clone();
        self.run(move |db| {
            let primary = case_key(&key.user_id, &key.case_id);

            let write_txn = db.begin_write()?;
            {
                let mut cases = write_txn.open_table(CASES)?;

                // Read existing value and deserialize before mutating
                let existing_bytes = {
                    let existing = cases
                        .get(primary.as_str())?
                        .ok_or_else(|| StorageError::NotFound(format!("case {}", key.case_id)))?;
                    existing.value().to_vec()
                };

                let mut item: CaseItem = serde_json::from_slice(&existing_bytes)?;
                if item.sms_status.is_terminal() {
                    return Err(StorageError::InvalidTransition(format!(
                        "case {} is already {}",
                        key.case_id, item.sms_status
                    )));
                }
                item.sms_status = status;

                let json = serde_json::to_vec(&item)?;
                cases.insert(primary.as_str(), json.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn list_cases_by_user_id(&self, user_id: &str) -> StorageResult<Vec<CaseSummary>> {
        let user_id = user_id.to_string();
        self.run(move |db| {
            let read_txn = db.begin_read()?;
            let idx = read_txn.open_table(CASE_TIMELINE)?;
            let cases = read_txn.open_table(CASES)?;

            let start = make_partition_prefix(&user_id);
            let end = make_partition_end(&user_id);

            let mut summaries = Vec::new();
            for entry in idx.range(start.as_slice()..end.as_slice())? {
                let entry = entry?;
                let case_id = entry.1.value().to_string();
                if let Some(value) = cases.get(case_key(&user_id, &case_id).as_str())? {
                    let item: CaseItem = serde_json::from_slice(value.value())?;
                    summaries.push(CaseSummary::from(&item));
                }
            }
            Ok(summaries)
        })
        .await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.run(|db| {
            let read_txn = db.begin_read()?;
            let _ = read_txn.open_table(USERS)?;
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================
