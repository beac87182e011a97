// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded retry for SMS delivery.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::models::SmsStatus;
use crate::phone::mask_phone;
use crate::sms::SmsProvider;

/// Maps the number of the attempt that just failed to the wait before the next one.
pub type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(
        max_attempts: u32,
        backoff: impl Fn(u32) -> Duration + Send + Sync + 'static,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
        }
    }

    /// Wait `step × attempt` after each failed attempt.
    pub fn linear(step: Duration, max_attempts: u32) -> Self {
        Self::new(max_attempts, move |attempt| step * attempt)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(DEFAULT_BACKOFF_STEP, DEFAULT_MAX_ATTEMPTS)
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Terminal result of a delivery attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// `SENT` or `FAILED`, never `PENDING`.
    pub status: SmsStatus,
    pub attempts: u32,
    pub message_id: Option<String>,
}

/// Send `message`, retrying per `policy`. Individual failures are logged and absorbed.
pub async fn deliver_with_retry(
    provider: &dyn SmsProvider,
    policy: &RetryPolicy,
    to: &str,
    message: &str,
) -> DeliveryOutcome {
    let mut attempt = 1;
    loop {
        match provider.send(to, message).await {
            Ok(receipt) => {
                return DeliveryOutcome {
                    status: SmsStatus::Sent,
                    attempts: attempt,
                    message_id: receipt.message_id,
                };
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    to = %mask_phone(to),
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "SMS attempt failed"
                );
                if attempt >= policy.max_attempts {
                    return DeliveryOutcome {
                        status: SmsStatus::Failed,
                        attempts: attempt,
                        message_id: None,
                    };
                }
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}
