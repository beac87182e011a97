// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # SMS Notification Gateway
//!
//! One [`SmsProvider`] is active per deployment, selected by `SMS_PROVIDER`:
//!
//! | Value | Provider | Tag stored on cases |
//! |-------|----------|---------------------|
//! | `mock` | [`MockSmsProvider`] (logs, always succeeds) | `MOCK` |
//! | `sns` | [`SnsSmsProvider`] (AWS SNS `Publish`) | `SNS` |
//!
//! The case pipeline only sees the trait object and the provider's tag.

pub mod mock;
pub mod sigv4;
pub mod sns;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{SmsConfig, SmsProviderKind};

pub use mock::MockSmsProvider;
pub use sns::{SnsSettings, SnsSmsProvider};

/// Delivery failure reported by a provider.
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS provider configuration missing: {0}")]
    Config(String),

    #[error("SMS request signing failed: {0}")]
    Signing(String),

    #[error("SMS request failed: {0}")]
    Request(String),

    #[error("SMS gateway rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Result of an accepted send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsReceipt {
    /// Gateway-assigned id, when the gateway returns one.
    pub message_id: Option<String>,
}

/// A text-message gateway.
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Tag recorded on each case as `smsProvider`.
    fn name(&self) -> &'static str;

    async fn send(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError>;
}

/// Build the provider selected by configuration.
pub fn provider_from_config(config: &SmsConfig) -> Result<Arc<dyn SmsProvider>, SmsError> {
    let provider: Arc<dyn SmsProvider> = match config.provider {
        SmsProviderKind::Mock => Arc::new(MockSmsProvider),
        SmsProviderKind::Sns => Arc::new(SnsSmsProvider::new(config.sns.clone())?),
    };
    info!(provider = provider.name(), "SMS provider ready");
    Ok(provider)
}
