// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::models::{Case, CaseKey, CaseSummary, SmsStatus, User};
use crate::sms::{SmsError, SmsProvider, SmsReceipt};
use crate::storage::{CaseStore, StorageError, StorageResult};

/// SMS provider that succeeds or fails following a script.
///
/// Once the script runs out every further send fails.
pub struct ScriptedSms {
    script: Mutex<VecDeque<bool>>,
    calls: AtomicU32,
    sent: Mutex<Vec<(String, String)>>,
    message_id: Option<String>,
}

impl ScriptedSms {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
            message_id: None,
        }
    }

    pub fn with_message_id(mut self, id: &str) -> Self {
        self.message_id = Some(id.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successful sends as `(to, message)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsProvider for ScriptedSms {
    fn name(&self) -> &'static str {
        "SCRIPTED"
    }

    async fn send(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let succeed = self.script.lock().unwrap().pop_front().unwrap_or(false);
        if succeed {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), message.to_string()));
            Ok(SmsReceipt {
                message_id: self.message_id.clone(),
            })
        } else {
            Err(SmsError::Request("scripted failure".to_string()))
        }
    }
}

/// Store wrapper that can be told to fail specific writes.
pub struct FlakyStore {
    inner: Arc<dyn CaseStore>,
    fail_inserts: bool,
    fail_updates: bool,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn CaseStore>) -> Self {
        Self {
            inner,
            fail_inserts: false,
            fail_updates: false,
        }
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }
}

fn injected() -> StorageError {
    StorageError::Backend("injected failure".to_string())
}

#[async_trait]
impl CaseStore for FlakyStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }

    async fn insert_user(&self, user: &User) -> StorageResult<()> {
        self.inner.insert_user(user).await
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn get_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        self.inner.get_user_by_id(id).await
    }

    async fn allocate_reference_number(&self) -> StorageResult<String> {
        self.inner.allocate_reference_number().await
    }

    async fn insert_case(&self, case: &Case) -> StorageResult<()> {
        if self.fail_inserts {
            return Err(injected());
        }
        self.inner.insert_case(case).await
    }

    async fn update_sms_status(&self, key: &CaseKey, status: SmsStatus) -> StorageResult<()> {
        if self.fail_updates {
            return Err(injected());
        }
        self.inner.update_sms_status(key, status).await
    }

    async fn list_cases_by_user_id(&self, user_id: &str) -> StorageResult<Vec<CaseSummary>> {
        self.inner.list_cases_by_user_id(user_id).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        if self.fail_inserts || self.fail_updates {
            return Err(injected());
        }
        self.inner.health_check().await
    }
}
