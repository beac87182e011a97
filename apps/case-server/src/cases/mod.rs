// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Case Submission Pipeline
//!
//! Submitting a case runs these steps in order:
//!
//! 1. Resolve the phone to notify (request phone, else profile phone)
//! 2. Allocate a reference number and persist the case as `PENDING`
//! 3. Deliver the SMS with bounded retry ([`retry`])
//! 4. Write the terminal SMS status back to storage
//!
//! Steps 1 and 2 are fatal to the request. Delivery failures only show up
//! as `smsStatus = FAILED`, and a failed status write is logged and
//! absorbed, since the case is already durable.

pub mod retry;
pub mod submission;

use std::sync::Arc;

use crate::models::CaseSummary;
use crate::sms::SmsProvider;
use crate::storage::{CaseStore, StorageResult};

pub use retry::{deliver_with_retry, DeliveryOutcome, RetryPolicy};
pub use submission::{render_sms, SubmissionError, SubmissionReceipt, SMS_TEMPLATE};

#[derive(Clone)]
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    sms: Arc<dyn SmsProvider>,
    retry: RetryPolicy,
}

impl CaseService {
    pub fn new(store: Arc<dyn CaseStore>, sms: Arc<dyn SmsProvider>) -> Self {
        Self {
            store,
            sms,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Tag of the active SMS provider.
    pub fn sms_provider(&self) -> &'static str {
        self.sms.name()
    }

    /// The caller's cases, newest first.
    pub async fn list_cases(&self, user_id: &str) -> StorageResult<Vec<CaseSummary>> {
        self.store.list_cases_by_user_id(user_id).await
    }

    /// Pick the number to notify: the one in the request, else the profile phone.
    pub async fn resolve_phone(
        &self,
        user_id: &str,
        requested: Option<String>,
    ) -> Result<String, SubmissionError> {
        if let Some(phone) = requested {
            return Ok(phone);
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(SubmissionError::Lookup)?;
        user.and_then(|u| u.phone)
            .ok_or(SubmissionError::PhoneRequired)
    }
}
