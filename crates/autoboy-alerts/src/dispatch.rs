// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of a won trigger to the user's notification channels.

use std::sync::Arc;
use std::time::Duration;

use autoboy_core::{
    AutoboyError, Message, MessageType, NotificationChannel, NotificationPayload,
    NotificationSink, Recipient, UserPush, within,
};
use autoboy_prometheus::recording;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::model::{
    Direction, NotificationPreferences, NotificationRecord, PriceAlert, Product, notification_id,
};
use crate::repo::AlertRepository;

/// What happened on each channel for one trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The in-app record was written by this dispatch.
    pub recorded: bool,
    /// Writing the in-app record failed; the other channels were still tried.
    pub record_failed: bool,
    /// Live sockets the push reached.
    pub pushed: usize,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub notified: bool,
}

/// Sends the notifications for alerts the engine has just triggered.
#[derive(Clone)]
pub struct Dispatcher {
    repo: AlertRepository,
    push: Arc<dyn UserPush>,
    email: Arc<dyn NotificationSink>,
    sms: Arc<dyn NotificationSink>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        repo: AlertRepository,
        push: Arc<dyn UserPush>,
        email: Arc<dyn NotificationSink>,
        sms: Arc<dyn NotificationSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            push,
            email,
            sms,
            timeout,
        }
    }

    /// Notify the owner of `alert`, which this process moved to `triggered`
    /// at `triggered_at` for `price`.
    ///
    /// The in-app record is written first and keyed by the trigger, so a
    /// second dispatch for the same trigger stops there. A failed write of
    /// that record is a channel failure like any other: logged, counted,
    /// and push, email and SMS are still attempted. Channel failures never
    /// undo the transition.
    pub async fn dispatch(
        &self,
        alert: &PriceAlert,
        product: &Product,
        price: f64,
        triggered_at: DateTime<Utc>,
    ) -> Result<DispatchOutcome, AutoboyError> {
        let mut outcome = DispatchOutcome::default();
        let payload = payload(alert, product, price, triggered_at);

        let record = NotificationRecord {
            id: notification_id(&alert.id, triggered_at),
            user_id: alert.user_id.clone(),
            kind: "price_alert".into(),
            title: payload.title.clone(),
            body: payload.body.clone(),
            is_read: false,
            created_at: self.repo.now(),
            data: payload.data.clone(),
        };
        match self.repo.insert_notification(&record).await {
            Ok(true) => {
                outcome.recorded = true;
                recording::record_notification("in_app", "sent");
            }
            Ok(false) => {
                debug!(alert_id = %alert.id, "notification already recorded for this trigger");
                return Ok(outcome);
            }
            Err(e) => {
                warn!(alert_id = %alert.id, error = %e, "failed to record in-app notification");
                recording::record_notification("in_app", "failed");
                outcome.record_failed = true;
            }
        }

        let user = match self.repo.user(&alert.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %alert.user_id, error = %e, "user lookup failed, using default preferences");
                None
            }
        };
        let prefs = user
            .as_ref()
            .map(|u| u.notification_preferences)
            .unwrap_or_else(NotificationPreferences::default);
        let recipient = Recipient {
            user_id: alert.user_id.clone(),
            email: user.as_ref().and_then(|u| u.email.clone()),
            phone: user.as_ref().and_then(|u| u.phone.clone()),
        };

        if alert.notify_push && prefs.push {
            let mut message =
                Message::new(MessageType::PriceAlertTriggered, payload.data.clone());
            message.timestamp = triggered_at;
            outcome.pushed = self.push.send_to_user(&alert.user_id, message);
            let result = if outcome.pushed > 0 { "sent" } else { "offline" };
            recording::record_notification("push", result);
        }

        let email = alert.notify_email && prefs.email;
        let sms = alert.notify_sms && prefs.sms;
        let (email_sent, sms_sent) = tokio::join!(
            self.send_external(email, &self.email, &recipient, &payload),
            self.send_external(sms, &self.sms, &recipient, &payload),
        );
        outcome.email_sent = email_sent;
        outcome.sms_sent = sms_sent;

        match self
            .repo
            .mark_notified(&alert.id, triggered_at, self.repo.now())
            .await
        {
            Ok(stamped) => outcome.notified = stamped,
            Err(e) => warn!(alert_id = %alert.id, error = %e, "failed to record notified_at"),
        }

        info!(
            alert_id = %alert.id,
            user_id = %alert.user_id,
            pushed = outcome.pushed,
            in_app = outcome.recorded,
            email = outcome.email_sent,
            sms = outcome.sms_sent,
            "price alert dispatched"
        );
        Ok(outcome)
    }

    async fn send_external(
        &self,
        enabled: bool,
        sink: &Arc<dyn NotificationSink>,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> bool {
        if !enabled {
            return false;
        }
        let channel = sink.channel();
        let address = match channel {
            NotificationChannel::Email => recipient.email.as_deref(),
            NotificationChannel::Sms => recipient.phone.as_deref(),
            NotificationChannel::InApp | NotificationChannel::Push => Some(recipient.user_id.as_str()),
        };
        if address.is_none_or(str::is_empty) {
            debug!(user_id = %recipient.user_id, %channel, "no address on file, skipping");
            recording::record_notification(&channel.to_string(), "skipped");
            return false;
        }

        match within(self.timeout, sink.send(recipient, payload)).await {
            Ok(()) => {
                recording::record_notification(&channel.to_string(), "sent");
                true
            }
            Err(e) => {
                warn!(user_id = %recipient.user_id, %channel, error = %e, "notification failed");
                recording::record_notification(&channel.to_string(), "failed");
                false
            }
        }
    }
}

fn payload(
    alert: &PriceAlert,
    product: &Product,
    price: f64,
    triggered_at: DateTime<Utc>,
) -> NotificationPayload {
    let name = product.name.as_deref().unwrap_or("A product you follow");
    let verb = match alert.direction {
        Direction::Below => "dropped to",
        Direction::Above => "rose to",
    };
    let mut data = Map::new();
    data.insert("alert_id".into(), Value::String(alert.id.clone()));
    data.insert("product_id".into(), Value::String(alert.product_id.clone()));
    data.insert("current_price".into(), json!(price));
    data.insert("target_price".into(), json!(alert.target_price));
    data.insert("direction".into(), json!(alert.direction));
    data.insert(
        "triggered_at".into(),
        autoboy_core::document::timestamp_value(triggered_at),
    );
    NotificationPayload {
        title: "Price alert".into(),
        body: format!(
            "{name} {verb} {price:.2} (your target: {:.2})",
            alert.target_price
        ),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertStatus;
    use crate::repo::{NOTIFICATIONS, USERS};
    use async_trait::async_trait;
    use autoboy_core::{
        AdapterType, ChangeStream, Document, DocumentStore, Filter, FindOptions, HealthStatus,
        ManualClock, PluginAdapter, Stage, Update, UpdateResult,
    };
    use autoboy_store::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct Sink {
        channel: NotificationChannel,
        fail: bool,
        sent: Mutex<Vec<Recipient>>,
    }

    impl Sink {
        fn new(channel: NotificationChannel, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                channel,
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PluginAdapter for Sink {
        fn name(&self) -> &str {
            "test"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
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
    impl NotificationSink for Sink {
        fn channel(&self) -> NotificationChannel {
            self.channel
        }
        async fn send(&self, r: &Recipient, _: &NotificationPayload) -> Result<(), AutoboyError> {
            self.sent.lock().unwrap().push(r.clone());
            if self.fail {
                return Err(AutoboyError::Notification {
                    channel: self.channel.to_string(),
                    message: "gateway down".into(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Push(Mutex<Vec<(String, Message)>>);

    impl UserPush for Push {
        fn send_to_user(&self, user_id: &str, message: Message) -> usize {
            self.0.lock().unwrap().push((user_id.to_string(), message));
            1
        }
    }

    /// A `MemoryStore` whose inserts into `notifications` fail.
    struct NotificationsDown(MemoryStore);

    #[async_trait]
    impl PluginAdapter for NotificationsDown {
        fn name(&self) -> &str {
            "notifications-down"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Store
        }
        async fn health_check(&self) -> Result<HealthStatus, AutoboyError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), AutoboyError> {
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for NotificationsDown {
        async fn find(
            &self,
            collection: &str,
            filter: &Filter,
            options: &FindOptions,
        ) -> Result<Vec<Document>, AutoboyError> {
            self.0.find(collection, filter, options).await
        }
        async fn insert_one(&self, collection: &str, doc: Document) -> Result<String, AutoboyError> {
            if collection == NOTIFICATIONS {
                return Err(AutoboyError::Internal("store unavailable".into()));
            }
            self.0.insert_one(collection, doc).await
        }
        async fn update_one(
            &self,
            collection: &str,
            filter: &Filter,
            update: &Update,
        ) -> Result<UpdateResult, AutoboyError> {
            self.0.update_one(collection, filter, update).await
        }
        async fn update_many(
            &self,
            collection: &str,
            filter: &Filter,
            update: &Update,
        ) -> Result<UpdateResult, AutoboyError> {
            self.0.update_many(collection, filter, update).await
        }
        async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AutoboyError> {
            self.0.delete_one(collection, filter).await
        }
        async fn aggregate(
            &self,
            collection: &str,
            pipeline: &[Stage],
        ) -> Result<Vec<Document>, AutoboyError> {
            self.0.aggregate(collection, pipeline).await
        }
        async fn count_documents(
            &self,
            collection: &str,
            filter: &Filter,
        ) -> Result<u64, AutoboyError> {
            self.0.count_documents(collection, filter).await
        }
        fn watch(&self, collection: &str) -> ChangeStream {
            self.0.watch(collection)
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        repo: AlertRepository,
        push: Arc<Push>,
        email: Arc<Sink>,
        sms: Arc<Sink>,
        dispatcher: Dispatcher,
    }

    async fn fixture(email_fails: bool, user: Value) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_one(USERS, user.as_object().cloned().unwrap())
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let repo = AlertRepository::new(store.clone(), clock, Duration::from_secs(5), 8);
        let push = Arc::new(Push::default());
        let email = Sink::new(NotificationChannel::Email, email_fails);
        let sms = Sink::new(NotificationChannel::Sms, false);
        let dispatcher = Dispatcher::new(
            repo.clone(),
            push.clone(),
            email.clone(),
            sms.clone(),
            Duration::from_secs(5),
        );
        Fixture {
            store,
            repo,
            push,
            email,
            sms,
            dispatcher,
        }
    }

    fn alert(now: DateTime<Utc>) -> PriceAlert {
        PriceAlert {
            id: "a1".into(),
            user_id: "u1".into(),
            product_id: "p1".into(),
            target_price: 100.0,
            current_price: Some(95.0),
            direction: Direction::Below,
            status: AlertStatus::Triggered,
            notify_email: true,
            notify_sms: true,
            notify_push: true,
            expires_at: None,
            triggered_at: Some(now),
            notified_at: None,
            created_at: now,
            updated_at: now,
            price_history: Vec::new(),
        }
    }

    fn product() -> Product {
        Product {
            id: "p1".into(),
            name: Some("Pixel 9".into()),
            price: 95.0,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn dispatches_enabled_channels_once_per_trigger() {
        let f = fixture(
            false,
            json!({"_id": "u1", "email": "u1@example.com", "phone": "+15551234567",
                   "notification_preferences": {"sms": true}}),
        )
        .await;
        let now = f.repo.now();
        let a = alert(now);
        f.store
            .insert_one("price_alerts", autoboy_core::document::to_document(&a).unwrap())
            .await
            .unwrap();

        let first = f.dispatcher.dispatch(&a, &product(), 95.0, now).await.unwrap();
        assert!(first.recorded && first.email_sent && first.sms_sent && first.notified);
        assert_eq!(first.pushed, 1);

        let second = f.dispatcher.dispatch(&a, &product(), 95.0, now).await.unwrap();
        assert_eq!(second, DispatchOutcome::default());

        assert_eq!(f.email.count(), 1);
        assert_eq!(f.sms.count(), 1);
        let pushes = f.push.0.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].1.kind, MessageType::PriceAlertTriggered);
        assert_eq!(pushes[0].1.data["alert_id"], "a1");
        assert_eq!(
            f.store
                .count_documents(NOTIFICATIONS, &Filter::eq("user_id", "u1"))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_the_rest() {
        let f = fixture(
            true,
            json!({"_id": "u1", "email": "u1@example.com", "phone": "+15551234567",
                   "notification_preferences": {"sms": true}}),
        )
        .await;
        let now = f.repo.now();
        let a = alert(now);
        f.store
            .insert_one("price_alerts", autoboy_core::document::to_document(&a).unwrap())
            .await
            .unwrap();

        let outcome = f.dispatcher.dispatch(&a, &product(), 95.0, now).await.unwrap();
        assert!(!outcome.email_sent);
        assert!(outcome.sms_sent);
        assert!(outcome.notified);
        let stored = f.repo.get("a1").await.unwrap().unwrap();
        assert_eq!(stored.notified_at, Some(now));
    }

    #[tokio::test]
    async fn in_app_write_failure_still_notifies_other_channels() {
        let store = Arc::new(NotificationsDown(MemoryStore::new()));
        store
            .insert_one(
                USERS,
                json!({"_id": "u1", "email": "u1@example.com"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let repo = AlertRepository::new(store.clone(), clock, Duration::from_secs(5), 8);
        let now = repo.now();
        let a = alert(now);
        store
            .insert_one("price_alerts", autoboy_core::document::to_document(&a).unwrap())
            .await
            .unwrap();

        let push = Arc::new(Push::default());
        let email = Sink::new(NotificationChannel::Email, false);
        let dispatcher = Dispatcher::new(
            repo.clone(),
            push.clone(),
            email.clone(),
            Sink::new(NotificationChannel::Sms, false),
            Duration::from_secs(5),
        );

        let outcome = dispatcher.dispatch(&a, &product(), 95.0, now).await.unwrap();
        assert!(outcome.record_failed);
        assert!(!outcome.recorded);
        assert_eq!(outcome.pushed, 1);
        assert!(outcome.email_sent);
        assert!(outcome.notified);

        assert_eq!(push.0.lock().unwrap().len(), 1);
        assert_eq!(email.count(), 1);
        assert_eq!(repo.get("a1").await.unwrap().unwrap().notified_at, Some(now));
    }

    #[tokio::test]
    async fn preferences_and_missing_addresses_skip_channels() {
        // sms defaults off; no phone on file either.
        let f = fixture(false, json!({"_id": "u1", "notification_preferences": {"push": false}})).await;
        let now = f.repo.now();
        let a = alert(now);

        let outcome = f.dispatcher.dispatch(&a, &product(), 95.0, now).await.unwrap();
        assert!(outcome.recorded);
        assert_eq!(outcome.pushed, 0);
        assert!(!outcome.email_sent);
        assert!(!outcome.sms_sent);
        assert_eq!(f.email.count(), 0);
        assert_eq!(f.sms.count(), 0);
        assert!(f.push.0.lock().unwrap().is_empty());
    }

    #[test]
    fn payload_mentions_product_and_target() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let p = payload(&alert(now), &product(), 95.0, now);
        assert_eq!(p.body, "Pixel 9 dropped to 95.00 (your target: 100.00)");
        assert_eq!(p.data["product_id"], "p1");
        assert_eq!(p.data["direction"], "below");
    }
}
