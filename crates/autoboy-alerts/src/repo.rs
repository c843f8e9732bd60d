// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed access to the collections the engine reads and writes.
//!
//! Every state change is a compare-and-set on the alert's current status,
//! so concurrent evaluators and user actions never overwrite each other.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use autoboy_core::document::{from_document, timestamp_value, to_document};
use autoboy_core::ids::new_document_id;
use autoboy_core::{
    AutoboyError, Clock, DocumentStore, Filter, FindOptions, SortOrder, Stage, Update, within,
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::debug;

use crate::model::{
    AlertStatus, NewAlert, NotificationRecord, PriceAlert, Product, UserContact,
};

pub const ALERTS: &str = "price_alerts";
pub const PRODUCTS: &str = "products";
pub const USERS: &str = "users";
pub const NOTIFICATIONS: &str = "notifications";

/// Filter matching alerts that have not expired at `now`.
fn unexpired(now: DateTime<Utc>) -> Filter {
    Filter::Or(vec![
        Filter::eq("expires_at", Value::Null),
        Filter::gt("expires_at", timestamp_value(now)),
    ])
}

fn in_status(id: &str, status: AlertStatus) -> Filter {
    Filter::id(id).and(Filter::eq("status", status.as_str()))
}

/// Repository over `price_alerts`, `products`, `users` and `notifications`.
#[derive(Clone)]
pub struct AlertRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    history_points: usize,
}

impl AlertRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
        history_points: usize,
    ) -> Self {
        Self {
            store,
            clock,
            timeout,
            history_points,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create an active alert, seeding `current_price` from the product.
    pub async fn create(&self, new: NewAlert) -> Result<PriceAlert, AutoboyError> {
        let now = self.now();
        let current_price = self.product(&new.product_id).await?.map(|p| p.price);
        let alert = PriceAlert {
            id: new_document_id(),
            user_id: new.user_id,
            product_id: new.product_id,
            target_price: new.target_price,
            current_price,
            direction: new.direction,
            status: AlertStatus::Active,
            notify_email: new.notify_email,
            notify_sms: new.notify_sms,
            notify_push: new.notify_push,
            expires_at: new.expires_at,
            triggered_at: None,
            notified_at: None,
            created_at: now,
            updated_at: now,
            price_history: Vec::new(),
        };
        within(self.timeout, self.store.insert_one(ALERTS, to_document(&alert)?)).await?;
        debug!(alert_id = %alert.id, user_id = %alert.user_id, "alert created");
        Ok(alert)
    }

    pub async fn get(&self, alert_id: &str) -> Result<Option<PriceAlert>, AutoboyError> {
        within(self.timeout, self.store.find_one(ALERTS, &Filter::id(alert_id)))
            .await?
            .map(from_document)
            .transpose()
    }

    async fn require(&self, alert_id: &str) -> Result<PriceAlert, AutoboyError> {
        self.get(alert_id).await?.ok_or_else(|| AutoboyError::NotFound {
            collection: ALERTS.to_string(),
            id: alert_id.to_string(),
        })
    }

    /// Soft-delete: `active -> cancelled`.
    pub async fn cancel(&self, alert_id: &str) -> Result<PriceAlert, AutoboyError> {
        let current = self.require(alert_id).await?;
        if !current.status.can_transition_to(AlertStatus::Cancelled) {
            return Err(invalid(current.status, AlertStatus::Cancelled));
        }
        let update = Update::new()
            .set("status", AlertStatus::Cancelled.as_str())
            .set("updated_at", timestamp_value(self.now()));
        let result = within(
            self.timeout,
            self.store
                .update_one(ALERTS, &in_status(alert_id, current.status), &update),
        )
        .await?;
        if result.matched == 0 {
            // Lost to a concurrent transition.
            let now = self.require(alert_id).await?;
            return Err(invalid(now.status, AlertStatus::Cancelled));
        }
        autoboy_prometheus::recording::record_alert_transition("cancelled");
        self.require(alert_id).await
    }

    /// Return a triggered or expired alert to `active` with a new target.
    ///
    /// Clears `triggered_at` and `notified_at`. An expired alert needs a new
    /// `expires_at` in the future.
    pub async fn reactivate(
        &self,
        alert_id: &str,
        target_price: f64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PriceAlert, AutoboyError> {
        let current = self.require(alert_id).await?;
        let now = self.now();
        // Leaving `expired` needs a fresh deadline; any new deadline must
        // lie ahead.
        let deadline_ok = match current.status {
            AlertStatus::Expired => expires_at.is_some_and(|at| at > now),
            _ => expires_at.is_none_or(|at| at > now),
        };
        if !current.status.can_transition_to(AlertStatus::Active) || !deadline_ok {
            return Err(invalid(current.status, AlertStatus::Active));
        }

        let mut update = Update::new()
            .set("status", AlertStatus::Active.as_str())
            .set("target_price", target_price)
            .set("updated_at", timestamp_value(now))
            .unset("triggered_at")
            .unset("notified_at");
        if let Some(at) = expires_at {
            update = update.set("expires_at", timestamp_value(at));
        }

        let result = within(
            self.timeout,
            self.store
                .update_one(ALERTS, &in_status(alert_id, current.status), &update),
        )
        .await?;
        if result.matched == 0 {
            let latest = self.require(alert_id).await?;
            return Err(invalid(latest.status, AlertStatus::Active));
        }
        autoboy_prometheus::recording::record_alert_transition("active");
        self.require(alert_id).await
    }

    /// Active alerts that have not expired, optionally for one product.
    pub async fn active_alerts(
        &self,
        now: DateTime<Utc>,
        product_id: Option<&str>,
    ) -> Result<Vec<PriceAlert>, AutoboyError> {
        let mut filter = Filter::eq("status", AlertStatus::Active.as_str()).and(unexpired(now));
        if let Some(product_id) = product_id {
            filter = filter.and(Filter::eq("product_id", product_id));
        }
        let docs = within(
            self.timeout,
            self.store.find(
                ALERTS,
                &filter,
                &FindOptions::default().sort("created_at", SortOrder::Asc),
            ),
        )
        .await?;
        docs.into_iter().map(from_document).collect()
    }

    /// Move every active alert whose `expires_at <= now` to `expired`.
    ///
    /// Each alert moves by its own CAS; returns how many moved.
    pub async fn expire_due(
        &self,
        now: DateTime<Utc>,
        product_id: Option<&str>,
    ) -> Result<usize, AutoboyError> {
        let mut filter = Filter::eq("status", AlertStatus::Active.as_str())
            .and(Filter::lte("expires_at", timestamp_value(now)));
        if let Some(product_id) = product_id {
            filter = filter.and(Filter::eq("product_id", product_id));
        }
        let due = within(
            self.timeout,
            self.store.find(ALERTS, &filter, &FindOptions::default()),
        )
        .await?;

        let update = Update::new()
            .set("status", AlertStatus::Expired.as_str())
            .set("updated_at", timestamp_value(now));
        let mut expired = 0;
        for doc in due {
            let Some(id) = autoboy_core::document::document_id(&doc) else {
                continue;
            };
            let cas = in_status(id, AlertStatus::Active)
                .and(Filter::lte("expires_at", timestamp_value(now)));
            let result = within(self.timeout, self.store.update_one(ALERTS, &cas, &update)).await?;
            if result.modified == 1 {
                debug!(alert_id = id, "alert expired");
                expired += 1;
            }
        }
        Ok(expired)
    }

    /// `active -> triggered` guarded on the alert still being active and
    /// unexpired. Returns false when another evaluator got there first.
    pub async fn try_trigger(
        &self,
        alert: &PriceAlert,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<bool, AutoboyError> {
        if alert.is_expired_at(now) {
            return Ok(false);
        }
        let cas = in_status(&alert.id, AlertStatus::Active).and(unexpired(now));
        let update = self
            .price_update(alert, price, now)
            .set("status", AlertStatus::Triggered.as_str())
            .set("triggered_at", timestamp_value(now))
            .unset("notified_at");
        let result = within(self.timeout, self.store.update_one(ALERTS, &cas, &update)).await?;
        Ok(result.matched == 1)
    }

    /// Record an observed price on an alert that did not fire.
    pub async fn observe_price(
        &self,
        alert: &PriceAlert,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<(), AutoboyError> {
        if alert.current_price == Some(price) && !alert.is_new_price(price) {
            return Ok(());
        }
        let cas = in_status(&alert.id, AlertStatus::Active);
        let update = self.price_update(alert, price, now);
        within(self.timeout, self.store.update_one(ALERTS, &cas, &update)).await?;
        Ok(())
    }

    fn price_update(&self, alert: &PriceAlert, price: f64, now: DateTime<Utc>) -> Update {
        let mut update = Update::new()
            .set("current_price", price)
            .set("updated_at", timestamp_value(now));
        if alert.is_new_price(price) && self.history_points > 0 {
            update = update.push_capped(
                "price_history",
                json!({ "price": price, "at": timestamp_value(now) }),
                self.history_points,
            );
        }
        update
    }

    /// Stamp `notified_at`, guarded on the trigger it belongs to.
    pub async fn mark_notified(
        &self,
        alert_id: &str,
        triggered_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, AutoboyError> {
        let guard = Filter::id(alert_id).and(Filter::eq("triggered_at", timestamp_value(triggered_at)));
        let update = Update::new().set("notified_at", timestamp_value(now));
        let result = within(self.timeout, self.store.update_one(ALERTS, &guard, &update)).await?;
        Ok(result.matched == 1)
    }

    pub async fn product(&self, product_id: &str) -> Result<Option<Product>, AutoboyError> {
        within(self.timeout, self.store.find_one(PRODUCTS, &Filter::id(product_id)))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn user(&self, user_id: &str) -> Result<Option<UserContact>, AutoboyError> {
        within(self.timeout, self.store.find_one(USERS, &Filter::id(user_id)))
            .await?
            .map(from_document)
            .transpose()
    }

    /// Insert an in-app record. `Ok(false)` when it already exists.
    pub async fn insert_notification(&self, record: &NotificationRecord) -> Result<bool, AutoboyError> {
        match within(
            self.timeout,
            self.store.insert_one(NOTIFICATIONS, to_document(record)?),
        )
        .await
        {
            Ok(_) => Ok(true),
            Err(AutoboyError::Duplicate { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Alert counts per status, optionally for one user.
    pub async fn status_counts(
        &self,
        user_id: Option<&str>,
    ) -> Result<BTreeMap<AlertStatus, u64>, AutoboyError> {
        let mut pipeline = Vec::new();
        if let Some(user_id) = user_id {
            pipeline.push(Stage::Match(Filter::eq("user_id", user_id)));
        }
        pipeline.push(Stage::Group {
            by: "status".into(),
            count_as: "count".into(),
        });
        let groups = within(self.timeout, self.store.aggregate(ALERTS, &pipeline)).await?;

        let mut counts = BTreeMap::new();
        for group in groups {
            let status = group
                .get("_id")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<AlertStatus>().ok());
            let count = group.get("count").and_then(Value::as_u64);
            if let (Some(status), Some(count)) = (status, count) {
                counts.insert(status, count);
            }
        }
        Ok(counts)
    }
}

fn invalid(from: AlertStatus, to: AlertStatus) -> AutoboyError {
    AutoboyError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}
