// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Development provider: logs instead of sending.

use async_trait::async_trait;
use tracing::info;

use super::{SmsError, SmsProvider, SmsReceipt};
use crate::phone::mask_phone;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockSmsProvider;

#[async_trait]
impl SmsProvider for MockSmsProvider {
    fn name(&self) -> &'static str {
        "MOCK"
    }

    async fn send(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        info!(to = %mask_phone(to), message = %message, "[MOCK SMS] message not sent");
        Ok(SmsReceipt::default())
    }
}
