// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AWS SNS `Publish` provider (query API over HTTPS, Signature V4).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use super::sigv4::{self, AwsCredentials, SigningRequest, FORM_CONTENT_TYPE};
use super::{SmsError, SmsProvider, SmsReceipt};
use crate::phone::mask_phone;

const SNS_API_VERSION: &str = "2010-03-31";
const SNS_SERVICE: &str = "sns";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SNS publishing options.
#[derive(Debug, Clone)]
pub struct SnsSettings {
    pub region: String,
    /// `Transactional` or `Promotional`.
    pub sms_type: String,
    pub sender_id: Option<String>,
    pub origination_number: Option<String>,
    pub credentials: Option<AwsCredentials>,
}

#[derive(Debug, Clone)]
pub struct SnsSmsProvider {
    settings: SnsSettings,
    credentials: AwsCredentials,
    host: String,
    http: Client,
}

impl SnsSmsProvider {
    pub fn new(settings: SnsSettings) -> Result<Self, SmsError> {
        let credentials = settings.credentials.clone().ok_or_else(|| {
            SmsError::Config("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required".to_string())
        })?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SmsError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            host: format!("sns.{}.amazonaws.com", settings.region),
            settings,
            credentials,
            http,
        })
    }

    /// Form body for a `Publish` call.
    fn publish_body(&self, to: &str, message: &str) -> String {
        let mut attributes = vec![("AWS.SNS.SMS.SMSType", self.settings.sms_type.as_str())];
        if let Some(sender_id) = &self.settings.sender_id {
            attributes.push(("AWS.SNS.SMS.SenderID", sender_id.as_str()));
        }
        if let Some(number) = &self.settings.origination_number {
            attributes.push(("AWS.MM.SMS.OriginationNumber", number.as_str()));
        }

        let mut form = url::form_urlencoded::Serializer::new(String::new());
        form.append_pair("Action", "Publish")
            .append_pair("Version", SNS_API_VERSION)
            .append_pair("PhoneNumber", to)
            .append_pair("Message", message);
        for (i, (name, value)) in attributes.into_iter().enumerate() {
            let entry = format!("MessageAttributes.entry.{}", i + 1);
            form.append_pair(&format!("{entry}.Name"), name)
                .append_pair(&format!("{entry}.Value.DataType"), "String")
                .append_pair(&format!("{entry}.Value.StringValue"), value);
        }
        form.finish()
    }
}

#[async_trait]
impl SmsProvider for SnsSmsProvider {
    fn name(&self) -> &'static str {
        "SNS"
    }

    async fn send(&self, to: &str, message: &str) -> Result<SmsReceipt, SmsError> {
        let body = self.publish_body(to, message);
        let signed = sigv4::sign(
            &self.credentials,
            &SigningRequest {
                method: "POST",
                host: &self.host,
                path: "/",
                query: "",
                payload: body.as_bytes(),
                region: &self.settings.region,
                service: SNS_SERVICE,
                timestamp: Utc::now(),
            },
        )?;

        let mut request = self
            .http
            .post(format!("https://{}/", self.host))
            .header("content-type", FORM_CONTENT_TYPE)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SmsError::Request(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            warn!(to = %mask_phone(to), status = status.as_u16(), "SNS publish rejected");
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let message_id = extract_message_id(&text);
        debug!(to = %mask_phone(to), message_id = ?message_id, "SNS publish accepted");
        Ok(SmsReceipt { message_id })
    }
}

/// Pull `<MessageId>` out of a `PublishResponse` document.
///
/// Plain text search: the first unprefixed `<MessageId>` element wins.
/// Namespace prefixes and CDATA sections are not understood; SNS emits
/// neither for this element.
fn extract_message_id(xml: &str) -> Option<String> {
    let start = xml.find("<MessageId>")? + "<MessageId>".len();
    let end = xml[start..].find("</MessageId>")? + start;
    let id = xml[start..end].trim();
    (!id.is_empty()).then(|| id.to_string())
}
