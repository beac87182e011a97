// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational backend on SQLite (`rusqlite`, bundled).
//!
//! ## Schema
//!
//! - `users`: `id` primary key, `username` UNIQUE
//! - `cases`: `id` primary key, `user_id` references `users(id)`,
//!   indexed on `(user_id, created_at)` for the owner listing
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so lexical order equals chronological order.
//!
//! The connection sits behind a mutex and every call runs on the blocking
//! pool, so SQLite sees a single writer at a time.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::info;

use super::reference::sequential_reference;
use super::{ensure_terminal, CaseStore, StorageError, StorageResult};
use crate::models::{Case, CaseKey, CaseStatus, CaseSummary, SmsStatus, User};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id              TEXT PRIMARY KEY,
        username        TEXT NOT NULL UNIQUE,
        password_hash   TEXT NOT NULL,
        phone           TEXT,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS cases (
        id                  TEXT PRIMARY KEY,
        reference_number    TEXT NOT NULL,
        user_id             TEXT NOT NULL REFERENCES users(id),
        phone               TEXT NOT NULL,
        title               TEXT NOT NULL,
        description         TEXT NOT NULL,
        status              TEXT NOT NULL DEFAULT 'SUBMITTED',
        sms_status          TEXT NOT NULL DEFAULT 'PENDING',
        sms_provider        TEXT NOT NULL,
        created_at          TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_cases_user_created
        ON cases(user_id, created_at);
";

/// SQLite-backed [`CaseStore`].
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Backend(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        // WAL mode for concurrent reads
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;

        let store = Self::with_connection(conn)?;
        info!(path = %path.display(), "SQLite database opened");
        Ok(store)
    }

    /// Private in-memory database, used by tests and local experiments.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StorageError::Backend(format!("sqlite lock poisoned: {e}")))?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl CaseStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_user(&self, user: &User) -> StorageResult<()> {
        let user = user.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (id, username, password_hash, phone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.username,
                    user.password_hash,
                    user.phone,
                    encode_timestamp(&user.created_at)
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::Conflict(format!("username {}", user.username))
                } else {
                    StorageError::Sqlite(e)
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let username = username.to_string();
        self.run(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, password_hash, phone, created_at
                     FROM users WHERE username = ?1",
                    [username],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    async fn get_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        let id = id.to_string();
        self.run(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, password_hash, phone, created_at
                     FROM users WHERE id = ?1",
                    [id],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    async fn allocate_reference_number(&self) -> StorageResult<String> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))?;
            Ok(sequential_reference(Utc::now(), count.max(0) as u64))
        })
        .await
    }

    async fn insert_case(&self, case: &Case) -> StorageResult<()> {
        let case = case.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO cases (id, reference_number, user_id, phone, title, description,
                                    status, sms_status, sms_provider, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    case.id,
                    case.reference_number,
                    case.user_id,
                    case.phone,
                    case.title,
                    case.description,
                    case.status.as_str(),
                    case.sms_status.as_str(),
                    case.sms_provider,
                    encode_timestamp(&case.created_at)
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update_sms_status(&self, key: &CaseKey, status: SmsStatus) -> StorageResult<()> {
        ensure_terminal(key, status)?;

        let key = key.clone();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE cases SET sms_status = ?1
                 WHERE id = ?2 AND user_id = ?3 AND sms_status = 'PENDING'",
                params![status.as_str(), key.case_id, key.user_id],
            )?;
            if changed == 1 {
                return Ok(());
            }

            let current: Option<String> = conn
                .query_row(
                    "SELECT sms_status FROM cases WHERE id = ?1 AND user_id = ?2",
                    params![key.case_id, key.user_id],
                    |row| row.get(0),
                )
                .optional()?;

            Err(match current {
                Some(current) => StorageError::InvalidTransition(format!(
                    "case {} is already {current}",
                    key.case_id
                )),
                None => StorageError::NotFound(format!("case {}", key.case_id)),
            })
        })
        .await
    }

    async fn list_cases_by_user_id(&self, user_id: &str) -> StorageResult<Vec<CaseSummary>> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, reference_number, title, status, sms_status, created_at
                 FROM cases
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map([user_id], summary_from_row)?;
            let summaries = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(summaries)
        })
        .await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        phone: row.get(3)?,
        created_at: decode_timestamp(4, row.get(4)?)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<CaseSummary> {
    let status: String = row.get(3)?;
    let sms_status: String = row.get(4)?;

    Ok(CaseSummary {
        id: row.get(0)?,
        reference_number: row.get(1)?,
        title: row.get(2)?,
        status: CaseStatus::parse(&status).ok_or_else(|| bad_column(3, &status))?,
        sms_status: SmsStatus::parse(&sms_status).ok_or_else(|| bad_column(4, &sms_status))?,
        created_at: decode_timestamp(5, row.get(5)?)?,
    })
}

fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn bad_column(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value {value:?}").into(),
    )
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// =============================================================================
// Tests
// =============================================================================
