// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Write, notify, reconcile.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use super::retry::deliver_with_retry;
use super::CaseService;
use crate::models::{Case, CaseStatus, SmsStatus};
use crate::phone::mask_phone;
use crate::storage::StorageError;
use crate::validation::CaseDraft;

pub const SMS_TEMPLATE: &str = "Your case {{referenceNumber}} has been successfully submitted. \
                                We will contact you if further details are required.";

pub fn render_sms(reference_number: &str) -> String {
    SMS_TEMPLATE.replace("{{referenceNumber}}", reference_number)
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("no phone number in the request or the caller's profile")]
    PhoneRequired,

    #[error("failed to look up caller profile: {0}")]
    Lookup(#[source] StorageError),

    #[error("failed to allocate reference number: {0}")]
    Allocation(#[source] StorageError),

    #[error("failed to persist case: {0}")]
    Persistence(#[source] StorageError),
}

/// What the caller learns about a submitted case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub reference_number: String,
    /// `SENT` or `FAILED`.
    pub sms_status: SmsStatus,
    pub sms_provider: String,
    pub masked_phone: String,
}

impl CaseService {
    /// Run the submission pipeline for `user_id`.
    ///
    /// Returns an error only when nothing was sent: the phone could not be
    /// resolved or the case could not be persisted.
    pub async fn submit(
        &self,
        user_id: &str,
        draft: CaseDraft,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let phone = self.resolve_phone(user_id, draft.phone).await?;
        let masked_phone = mask_phone(&phone);

        let reference_number = self
            .store
            .allocate_reference_number()
            .await
            .map_err(SubmissionError::Allocation)?;

        let case = Case {
            id: Uuid::new_v4().to_string(),
            reference_number,
            user_id: user_id.to_string(),
            title: draft.title,
            description: draft.description,
            phone,
            status: CaseStatus::Submitted,
            sms_status: SmsStatus::Pending,
            sms_provider: self.sms.name().to_string(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert_case(&case).await {
            error!(
                user_id = %user_id,
                phone = %masked_phone,
                error = %e,
                "Failed to persist case"
            );
            return Err(SubmissionError::Persistence(e));
        }

        let message = render_sms(&case.reference_number);
        let outcome =
            deliver_with_retry(self.sms.as_ref(), &self.retry, &case.phone, &message).await;
        if outcome.status == SmsStatus::Failed {
            error!(
                reference_number = %case.reference_number,
                phone = %masked_phone,
                attempts = outcome.attempts,
                "SMS failed after case creation"
            );
        }

        if let Err(e) = self.store.update_sms_status(&case.key(), outcome.status).await {
            error!(
                reference_number = %case.reference_number,
                sms_status = %outcome.status,
                error = %e,
                "Failed to update SMS status"
            );
        }

        info!(
            reference_number = %case.reference_number,
            sms_status = %outcome.status,
            sms_provider = %case.sms_provider,
            attempts = outcome.attempts,
            message_id = ?outcome.message_id,
            "Case submitted"
        );

        Ok(SubmissionReceipt {
            reference_number: case.reference_number,
            sms_status: outcome.status,
            sms_provider: case.sms_provider,
            masked_phone,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cases::RetryPolicy;
    use crate::storage::{CaseStore, SqliteStore};
    use crate::testing::{FlakyStore, ScriptedSms};

    fn instant_retry() -> RetryPolicy {
        RetryPolicy::linear(Duration::ZERO, 3)
    }

    fn draft(phone: Option<&str>) -> CaseDraft {
        CaseDraft {
            title: "Broken street light".to_string(),
            description: "The light outside block 12 has been out for a week".to_string(),
            phone: phone.map(str::to_string),
        }
    }

    async fn seeded(store: &dyn CaseStore, phone: Option<&str>) -> String {
        let user = crate::models::User {
            id: Uuid::new_v4().to_string(),
            username: "alice".to_string(),
            password_hash: "hash".to_string(),
            phone: phone.map(str::to_string),
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.unwrap();
        user.id
    }

    fn service(store: Arc<dyn CaseStore>, sms: Arc<ScriptedSms>) -> CaseService {
        CaseService::new(store, sms).with_retry_policy(instant_retry())
    }

    #[test]
    fn template_carries_reference() {
        assert_eq!(
            render_sms("CASE-2026-0001"),
            "Your case CASE-2026-0001 has been successfully submitted. \
             We will contact you if further details are required."
        );
    }

    #[tokio::test]
    async fn successful_delivery_is_reconciled_as_sent() {
        let store: Arc<dyn CaseStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(store.as_ref(), None).await;
        let sms = Arc::new(ScriptedSms::new([true]));

        let receipt = service(Arc::clone(&store), Arc::clone(&sms))
            .submit(&owner, draft(Some("+6512345678")))
            .await
            .unwrap();

        assert!(receipt.reference_number.starts_with("CASE-"));
        assert_eq!(receipt.sms_status, SmsStatus::Sent);
        assert_eq!(receipt.sms_provider, "SCRIPTED");
        assert_eq!(receipt.masked_phone, "+65****5678");

        let sent = sms.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+6512345678");
        assert!(sent[0].1.contains(&receipt.reference_number));

        let listed = store.list_cases_by_user_id(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sms_status, SmsStatus::Sent);
    }

    #[tokio::test]
    async fn retries_until_third_attempt_succeeds() {
        let store: Arc<dyn CaseStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(store.as_ref(), None).await;
        let sms = Arc::new(ScriptedSms::new([false, false, true]));

        let receipt = service(Arc::clone(&store), Arc::clone(&sms))
            .submit(&owner, draft(Some("+6512345678")))
            .await
            .unwrap();

        assert_eq!(receipt.sms_status, SmsStatus::Sent);
        assert_eq!(sms.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_still_succeed_as_failed() {
        let store: Arc<dyn CaseStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(store.as_ref(), None).await;
        let sms = Arc::new(ScriptedSms::new([false, false, false]));

        let receipt = service(Arc::clone(&store), Arc::clone(&sms))
            .submit(&owner, draft(Some("+6512345678")))
            .await
            .unwrap();

        assert_eq!(receipt.sms_status, SmsStatus::Failed);
        assert_eq!(sms.calls(), 3);

        let listed = store.list_cases_by_user_id(&owner).await.unwrap();
        assert_eq!(listed[0].sms_status, SmsStatus::Failed);
    }

    #[tokio::test]
    async fn persistence_failure_sends_nothing() {
        let inner = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(inner.as_ref(), None).await;
        let store: Arc<dyn CaseStore> = Arc::new(FlakyStore::new(inner).failing_inserts());
        let sms = Arc::new(ScriptedSms::new([true]));

        let result = service(store, Arc::clone(&sms))
            .submit(&owner, draft(Some("+6512345678")))
            .await;

        assert!(matches!(result, Err(SubmissionError::Persistence(_))));
        assert_eq!(sms.calls(), 0);
    }

    #[tokio::test]
    async fn reconciliation_failure_is_absorbed() {
        let inner = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(inner.as_ref(), None).await;
        let store: Arc<dyn CaseStore> =
            Arc::new(FlakyStore::new(Arc::clone(&inner) as Arc<dyn CaseStore>).failing_updates());
        let sms = Arc::new(ScriptedSms::new([true]));

        let receipt = service(store, Arc::clone(&sms))
            .submit(&owner, draft(Some("+6512345678")))
            .await
            .unwrap();

        assert_eq!(receipt.sms_status, SmsStatus::Sent);
        // The stored status stays PENDING until corrected out of band.
        let listed = inner.list_cases_by_user_id(&owner).await.unwrap();
        assert_eq!(listed[0].sms_status, SmsStatus::Pending);
    }

    #[tokio::test]
    async fn profile_phone_is_the_fallback() {
        let store: Arc<dyn CaseStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(store.as_ref(), Some("+6598765432")).await;
        let sms = Arc::new(ScriptedSms::new([true]));

        let receipt = service(store, Arc::clone(&sms))
            .submit(&owner, draft(None))
            .await
            .unwrap();

        assert_eq!(receipt.masked_phone, "+65****5432");
        assert_eq!(sms.sent()[0].0, "+6598765432");
    }

    #[tokio::test]
    async fn missing_phone_is_rejected_before_persistence() {
        let store: Arc<dyn CaseStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let owner = seeded(store.as_ref(), None).await;
        let sms = Arc::new(ScriptedSms::new([true]));

        let result = service(Arc::clone(&store), Arc::clone(&sms))
            .submit(&owner, draft(None))
            .await;

        assert!(matches!(result, Err(SubmissionError::PhoneRequired)));
        assert_eq!(sms.calls(), 0);
        assert!(store.list_cases_by_user_id(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn works_against_the_partitioned_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn CaseStore> =
            Arc::new(crate::storage::RedbStore::open(&dir.path().join("cases.redb")).unwrap());
        let owner = seeded(store.as_ref(), None).await;
        let sms = Arc::new(ScriptedSms::new([false, true]));

        let receipt = service(Arc::clone(&store), sms)
            .submit(&owner, draft(Some("+6512345678")))
            .await
            .unwrap();

        assert_eq!(receipt.sms_status, SmsStatus::Sent);
        let listed = store.list_cases_by_user_id(&owner).await.unwrap();
        assert_eq!(listed[0].sms_status, SmsStatus::Sent);
        assert_eq!(listed[0].reference_number, receipt.reference_number);
    }
}
