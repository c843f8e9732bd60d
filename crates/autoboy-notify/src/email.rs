// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP email sink.

use async_trait::async_trait;
use autoboy_config::EmailConfig;
use autoboy_core::{
    AdapterType, AutoboyError, HealthStatus, NotificationChannel, NotificationPayload,
    NotificationSink, PluginAdapter, Recipient,
};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::notification_error;

const CHANNEL: NotificationChannel = NotificationChannel::Email;

/// Sends plain-text email over SMTP with STARTTLS.
pub struct SmtpEmailSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSink {
    /// `Ok(None)` when no SMTP host is configured.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, AutoboyError> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(None);
        };
        let from = config
            .from_address
            .as_deref()
            .ok_or_else(|| AutoboyError::Config("email.from_address is required with smtp_host".into()))?
            .parse::<Mailbox>()
            .map_err(|e| AutoboyError::Config(format!("invalid email.from_address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AutoboyError::Config(format!("invalid email.smtp_host: {e}")))?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }

    fn compose(&self, to: &str, payload: &NotificationPayload) -> Result<Message, AutoboyError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| notification_error(CHANNEL, format!("invalid address {to}: {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(payload.title.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(payload.body.clone())
            .map_err(|e| notification_error(CHANNEL, e.to_string()))
    }
}

#[async_trait]
impl PluginAdapter for SmtpEmailSink {
    fn name(&self) -> &str {
        "smtp-email"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, AutoboyError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Degraded("SMTP server refused NOOP".into())),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("SMTP unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), AutoboyError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for SmtpEmailSink {
    fn channel(&self) -> NotificationChannel {
        CHANNEL
    }

    async fn send(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> Result<(), AutoboyError> {
        let Some(address) = recipient.email.as_deref() else {
            return Err(notification_error(CHANNEL, "recipient has no email address"));
        };
        let message = self.compose(address, payload)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| notification_error(CHANNEL, e.to_string()))?;
        debug!(user_id = %recipient.user_id, "email sent");
        Ok(())
    }
}
