// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use autoboy_core::{
    AdapterType, AutoboyError, HealthStatus, NotificationChannel, NotificationPayload,
    NotificationSink, PluginAdapter, Recipient,
};
use tracing::info;

/// Sink that only writes a log line. Stands in for unconfigured channels.
pub struct LogSink {
    channel: NotificationChannel,
    name: String,
}

impl LogSink {
    pub fn new(channel: NotificationChannel) -> Self {
        Self {
            channel,
            name: format!("log-{channel}"),
        }
    }
}

#[async_trait]
impl PluginAdapter for LogSink {
    fn name(&self) -> &str {
        &self.name
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
impl NotificationSink for LogSink {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> Result<(), AutoboyError> {
        info!(
            channel = %self.channel,
            user_id = %recipient.user_id,
            title = %payload.title,
            "notification (not delivered, channel unconfigured)"
        );
        Ok(())
    }
}
