// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Behaviour every [`CaseStore`] backend must share.
//!
//! Each backend's test module calls these against its own store instance.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{CaseStore, StorageError};
use crate::models::{Case, CaseKey, CaseStatus, SmsStatus, User};

fn new_user(username: &str) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        phone: Some("+6512345678".to_string()),
        created_at: Utc::now(),
    }
}

/// Insert a user and return its id.
pub async fn seed_user(store: &dyn CaseStore, username: &str) -> String {
    let user = new_user(username);
    store.insert_user(&user).await.unwrap();
    user.id
}

/// A `PENDING` case owned by `owner`, created `offset_secs` from now.
pub fn pending_case(owner: &str, title: &str, offset_secs: i64) -> Case {
    let id = Uuid::new_v4().to_string();
    Case {
        reference_number: format!("CASE-2026-{}", &id[..4]),
        id,
        user_id: owner.to_string(),
        title: title.to_string(),
        description: "Water has been leaking from the ceiling".to_string(),
        phone: "+6512345678".to_string(),
        status: CaseStatus::Submitted,
        sms_status: SmsStatus::Pending,
        sms_provider: "MOCK".to_string(),
        created_at: Utc::now() + Duration::seconds(offset_secs),
    }
}

pub async fn user_round_trip(store: &dyn CaseStore) {
    let user = new_user("alice");
    store.insert_user(&user).await.unwrap();

    let by_name = store.get_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);
    assert_eq!(by_name.password_hash, user.password_hash);
    assert_eq!(by_name.phone.as_deref(), Some("+6512345678"));

    let by_id = store.get_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "alice");

    assert!(store.get_user_by_username("bob").await.unwrap().is_none());
    assert!(store.get_user_by_id("missing").await.unwrap().is_none());
}

pub async fn duplicate_username_conflicts(store: &dyn CaseStore) {
    seed_user(store, "alice").await;

    let err = store.insert_user(&new_user("alice")).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");
}

pub async fn concurrent_registrations_admit_exactly_one<S>(store: Arc<S>)
where
    S: CaseStore + 'static,
{
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.insert_user(&new_user("racer")).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => created += 1,
            Err(StorageError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

pub async fn cases_listed_newest_first_per_owner(store: &dyn CaseStore) {
    let alice = seed_user(store, "alice").await;
    let bob = seed_user(store, "bob").await;

    let oldest = pending_case(&alice, "Oldest case title", -120);
    let newest = pending_case(&alice, "Newest case title", 0);
    let middle = pending_case(&alice, "Middle case title", -60);
    let other = pending_case(&bob, "Someone else's case", -30);
    for case in [&oldest, &newest, &middle, &other] {
        store.insert_case(case).await.unwrap();
    }

    let listed = store.list_cases_by_user_id(&alice).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![newest.id.as_str(), middle.id.as_str(), oldest.id.as_str()]);
    assert_eq!(listed[0].title, "Newest case title");
    assert_eq!(listed[0].sms_status, SmsStatus::Pending);
    assert_eq!(listed[0].status, CaseStatus::Submitted);

    let bobs = store.list_cases_by_user_id(&bob).await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].id, other.id);
}

pub async fn sms_status_transitions_once(store: &dyn CaseStore) {
    let owner = seed_user(store, "alice").await;
    let case = pending_case(&owner, "Pothole on main road", 0);
    store.insert_case(&case).await.unwrap();

    let err = store
        .update_sms_status(&case.key(), SmsStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition(_)));

    store
        .update_sms_status(&case.key(), SmsStatus::Sent)
        .await
        .unwrap();
    let listed = store.list_cases_by_user_id(&owner).await.unwrap();
    assert_eq!(listed[0].sms_status, SmsStatus::Sent);

    let err = store
        .update_sms_status(&case.key(), SmsStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidTransition(_)), "got {err:?}");

    let listed = store.list_cases_by_user_id(&owner).await.unwrap();
    assert_eq!(listed[0].sms_status, SmsStatus::Sent);
}

pub async fn update_requires_matching_owner(store: &dyn CaseStore) {
    let owner = seed_user(store, "alice").await;
    let case = pending_case(&owner, "Noise complaint at night", 0);
    store.insert_case(&case).await.unwrap();

    let wrong_owner = CaseKey {
        user_id: "someone-else".to_string(),
        case_id: case.id.clone(),
    };
    let err = store
        .update_sms_status(&wrong_owner, SmsStatus::Sent)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");

    let listed = store.list_cases_by_user_id(&owner).await.unwrap();
    assert_eq!(listed[0].sms_status, SmsStatus::Pending);
}

pub async fn empty_listing_is_not_an_error(store: &dyn CaseStore) {
    let owner = seed_user(store, "quiet").await;
    assert!(store.list_cases_by_user_id(&owner).await.unwrap().is_empty());
    assert!(store.list_cases_by_user_id("nobody").await.unwrap().is_empty());
    store.health_check().await.unwrap();
}
