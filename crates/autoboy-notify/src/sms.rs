// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS through an HTTP gateway.
//!
//! Posts a form-encoded `To`/`From`/`Body` body with HTTP basic auth, the
//! shape accepted by Twilio-compatible messaging APIs.

use std::time::Duration;

use async_trait::async_trait;
use autoboy_config::SmsConfig;
use autoboy_core::{
    AdapterType, AutoboyError, HealthStatus, NotificationChannel, NotificationPayload,
    NotificationSink, PluginAdapter, Recipient,
};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::notification_error;

const CHANNEL: NotificationChannel = NotificationChannel::Sms;

/// Sends SMS by POSTing to a messaging API.
#[derive(Debug, Clone)]
pub struct HttpSmsSink {
    client: reqwest::Client,
    api_url: String,
    account_id: String,
    auth_token: String,
    from_number: String,
}

impl HttpSmsSink {
    /// `Ok(None)` when no API URL is configured.
    pub fn from_config(config: &SmsConfig) -> Result<Option<Self>, AutoboyError> {
        let Some(api_url) = config.api_url.clone() else {
            return Ok(None);
        };
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .ok_or_else(|| AutoboyError::Config(format!("sms.{key} is required with api_url")))
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AutoboyError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            api_url,
            account_id: required(&config.account_id, "account_id")?,
            auth_token: required(&config.auth_token, "auth_token")?,
            from_number: required(&config.from_number, "from_number")?,
        }))
    }
}

#[async_trait]
impl PluginAdapter for HttpSmsSink {
    fn name(&self) -> &str {
        "http-sms"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, AutoboyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AutoboyError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for HttpSmsSink {
    fn channel(&self) -> NotificationChannel {
        CHANNEL
    }

    async fn send(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> Result<(), AutoboyError> {
        let Some(phone) = recipient.phone.as_deref() else {
            return Err(notification_error(CHANNEL, "recipient has no phone number"));
        };
        let text = format!("{}: {}", payload.title, payload.body);
        let form = serde_urlencoded::to_string([
            ("To", phone),
            ("From", self.from_number.as_str()),
            ("Body", text.as_str()),
        ])
        .map_err(|e| notification_error(CHANNEL, e.to_string()))?;

        let response = self
            .client
            .post(&self.api_url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| notification_error(CHANNEL, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "sms gateway rejected message");
            return Err(notification_error(CHANNEL, format!("gateway returned {status}: {body}")));
        }
        debug!(user_id = %recipient.user_id, "sms sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(base: &str) -> HttpSmsSink {
        HttpSmsSink::from_config(&SmsConfig {
            api_url: Some(format!("{base}/Messages")),
            account_id: Some("AC123".into()),
            auth_token: Some("tok".into()),
            from_number: Some("+15550001111".into()),
        })
        .unwrap()
        .unwrap()
    }

    fn recipient() -> Recipient {
        Recipient {
            user_id: "u1".into(),
            email: None,
            phone: Some("+15552223333".into()),
        }
    }

    fn payload() -> NotificationPayload {
        NotificationPayload {
            title: "Price drop".into(),
            body: "now 95.00".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        // base64("AC123:tok")
        Mock::given(method("POST"))
            .and(path("/Messages"))
            .and(header("authorization", "Basic QUMxMjM6dG9r"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("To=%2B15552223333"))
            .and(body_string_contains("Body=Price+drop%3A+now+95.00"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        sink(&server.uri()).send(&recipient(), &payload()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad number"))
            .mount(&server)
            .await;

        let err = sink(&server.uri())
            .send(&recipient(), &payload())
            .await
            .unwrap_err();
        let AutoboyError::Notification { channel, message } = err else {
            panic!("expected notification error");
        };
        assert_eq!(channel, "sms");
        assert!(message.contains("400"));
    }

    #[tokio::test]
    async fn recipient_without_phone_is_rejected() {
        let err = sink("http://127.0.0.1:9")
            .send(&Recipient::default(), &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, AutoboyError::Notification { .. }));
    }

    #[test]
    fn partial_config_is_rejected() {
        let err = HttpSmsSink::from_config(&SmsConfig {
            api_url: Some("http://x".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AutoboyError::Config(_)));
    }
}
