// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink that captures sends for assertions.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use autoboy_core::{
    AdapterType, AutoboyError, HealthStatus, NotificationChannel, NotificationPayload,
    NotificationSink, PluginAdapter, Recipient,
};
use tokio::sync::Mutex;

/// A notification sink for testing.
///
/// Every call to `send()` is captured, including calls that are made to
/// fail with [`MockSink::set_failing`].
pub struct MockSink {
    channel: NotificationChannel,
    name: String,
    failing: AtomicBool,
    sent: Mutex<Vec<(Recipient, NotificationPayload)>>,
}

impl MockSink {
    pub fn new(channel: NotificationChannel) -> Self {
        Self {
            channel,
            name: format!("mock-{channel}"),
            failing: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent sends return a `Notification` error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<(Recipient, NotificationPayload)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockSink {
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
impl NotificationSink for MockSink {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> Result<(), AutoboyError> {
        self.sent
            .lock()
            .await
            .push((recipient.clone(), payload.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(AutoboyError::Notification {
                channel: self.channel.to_string(),
                message: "mock failure".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_even_when_failing() {
        let sink = MockSink::new(NotificationChannel::Email);
        let to = Recipient {
            user_id: "u1".into(),
            email: Some("u1@example.com".into()),
            phone: None,
        };
        sink.send(&to, &NotificationPayload::default()).await.unwrap();
        sink.set_failing(true);
        assert!(sink.send(&to, &NotificationPayload::default()).await.is_err());
        assert_eq!(sink.sent_count().await, 2);
        assert_eq!(sink.name(), "mock-email");
    }
}
