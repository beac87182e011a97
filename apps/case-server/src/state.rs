// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::accounts::AccountService;
use crate::api::rate_limit::RateLimiter;
use crate::auth::CredentialService;
use crate::cases::{CaseService, RetryPolicy};
use crate::config::RateLimitConfig;
use crate::sms::SmsProvider;
use crate::storage::CaseStore;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CaseStore>,
    pub credentials: Arc<CredentialService>,
    pub accounts: AccountService,
    pub cases: CaseService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CaseStore>,
        sms: Arc<dyn SmsProvider>,
        credentials: CredentialService,
    ) -> Self {
        let credentials = Arc::new(credentials);
        Self {
            accounts: AccountService::new(Arc::clone(&store), Arc::clone(&credentials)),
            cases: CaseService::new(Arc::clone(&store), sms),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
            store,
            credentials,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.cases = self.cases.with_retry_policy(retry);
        self
    }

    /// Replace the default write-route limit.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(config));
        self
    }

    /// In-memory SQLite, mock SMS and no retry delay.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::with_provider(Arc::new(crate::sms::MockSmsProvider))
    }

    #[cfg(test)]
    pub fn with_provider(sms: Arc<dyn SmsProvider>) -> Self {
        let store = crate::storage::SqliteStore::open_in_memory()
            .expect("in-memory sqlite should open");
        Self::new(Arc::new(store), sms, CredentialService::new("test-secret"))
            .with_retry_policy(RetryPolicy::linear(std::time::Duration::ZERO, 3))
    }
}
