// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alert records and the alert state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Which side of the target price fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Below,
    Above,
}

impl Direction {
    /// Inclusive comparison: a price exactly at target is a hit.
    pub fn is_hit(self, price: f64, target: f64) -> bool {
        match self {
            Direction::Below => price <= target,
            Direction::Above => price >= target,
        }
    }
}

/// Lifecycle state of an alert.
///
/// ```text
/// active -> triggered   evaluation hit (guarded)
/// active -> expired     evaluation after expires_at
/// active -> cancelled   user delete
/// triggered -> active   user reactivation
/// expired -> active     user reactivation with a new expires_at
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Triggered,
    Expired,
    Cancelled,
}

impl AlertStatus {
    pub fn can_transition_to(self, to: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, to),
            (Active, Triggered)
                | (Active, Expired)
                | (Active, Cancelled)
                | (Triggered, Active)
                | (Expired, Active)
        )
    }

    /// The status as stored in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Triggered => "triggered",
            AlertStatus::Expired => "expired",
            AlertStatus::Cancelled => "cancelled",
        }
    }
}

/// One observed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub at: DateTime<Utc>,
}

/// A stored price alert (`price_alerts` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub target_price: f64,
    /// Most recently observed product price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    pub direction: Direction,
    pub status: AlertStatus,
    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_sms: bool,
    #[serde(default)]
    pub notify_push: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bounded, oldest first.
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
}

impl PriceAlert {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether `price` differs from the last recorded history point.
    pub fn is_new_price(&self, price: f64) -> bool {
        self.price_history.last().is_none_or(|p| p.price != price)
    }
}

/// Input for creating an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub user_id: String,
    pub product_id: String,
    pub target_price: f64,
    pub direction: Direction,
    #[serde(default)]
    pub notify_email: bool,
    #[serde(default)]
    pub notify_sms: bool,
    #[serde(default)]
    pub notify_push: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// The subset of a `products` document the engine reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price: f64,
    #[serde(default = "yes")]
    pub is_active: bool,
}

/// Per-user channel switches (`users.notification_preferences`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "yes")]
    pub email: bool,
    #[serde(default = "yes")]
    pub push: bool,
    #[serde(default)]
    pub sms: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sms: false,
        }
    }
}

/// The subset of a `users` document used for delivery.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserContact {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notification_preferences: NotificationPreferences,
}

fn yes() -> bool {
    true
}

/// An in-app notification (`notifications` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Identifier of the in-app record for one trigger of one alert.
///
/// Deterministic, so a second insert for the same trigger is rejected as a
/// duplicate by the store.
pub fn notification_id(alert_id: &str, triggered_at: DateTime<Utc>) -> String {
    format!("price_alert:{alert_id}:{}", triggered_at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hit_is_inclusive() {
        assert!(Direction::Below.is_hit(100.0, 100.0));
        assert!(Direction::Below.is_hit(95.0, 100.0));
        assert!(!Direction::Below.is_hit(100.01, 100.0));
        assert!(Direction::Above.is_hit(100.0, 100.0));
        assert!(!Direction::Above.is_hit(99.99, 100.0));
    }

    #[test]
    fn allowed_transitions() {
        use AlertStatus::*;
        assert!(Active.can_transition_to(Triggered));
        assert!(Expired.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Active));
        assert!(!Triggered.can_transition_to(Triggered));
        assert!(!Triggered.can_transition_to(Expired));
        assert_eq!(Cancelled.as_str(), Cancelled.to_string());
    }

    #[test]
    fn alert_round_trips_through_json_with_absent_optionals() {
        let json = serde_json::json!({
            "_id": "a1",
            "user_id": "u1",
            "product_id": "p1",
            "target_price": 100,
            "direction": "below",
            "status": "active",
            "created_at": "2026-03-01T12:00:00.000Z",
            "updated_at": "2026-03-01T12:00:00.000Z",
        });
        let alert: PriceAlert = serde_json::from_value(json).unwrap();
        assert_eq!(alert.target_price, 100.0);
        assert!(alert.current_price.is_none());
        assert!(!alert.notify_email);
        assert!(alert.price_history.is_empty());

        let back = serde_json::to_value(&alert).unwrap();
        assert!(back.get("triggered_at").is_none());
        assert_eq!(back["status"], "active");
    }

    #[test]
    fn preferences_default_sms_off() {
        let user: UserContact = serde_json::from_value(serde_json::json!({"_id": "u1"})).unwrap();
        assert_eq!(user.notification_preferences, NotificationPreferences::default());
        assert!(!user.notification_preferences.sms);

        let partial: UserContact = serde_json::from_value(
            serde_json::json!({"_id": "u1", "notification_preferences": {"sms": true}}),
        )
        .unwrap();
        assert!(partial.notification_preferences.email);
        assert!(partial.notification_preferences.sms);
    }

    #[test]
    fn notification_id_is_stable_per_trigger() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(notification_id("a1", at), notification_id("a1", at));
        assert_ne!(
            notification_id("a1", at),
            notification_id("a1", at + chrono::Duration::milliseconds(1))
        );
    }

    #[test]
    fn expiry_check() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut alert: PriceAlert = serde_json::from_value(serde_json::json!({
            "_id": "a1", "user_id": "u", "product_id": "p", "target_price": 1,
            "direction": "above", "status": "active",
            "created_at": "2026-03-01T00:00:00Z", "updated_at": "2026-03-01T00:00:00Z",
        }))
        .unwrap();
        assert!(!alert.is_expired_at(now));
        alert.expires_at = Some(now);
        assert!(alert.is_expired_at(now));
        alert.expires_at = Some(now + chrono::Duration::seconds(1));
        assert!(!alert.is_expired_at(now));
    }
}
