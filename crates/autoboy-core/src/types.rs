// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the hub, the alert engine, and their collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Notifier,
    Observability,
}

/// Delivery channels a triggered alert can notify through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationChannel {
    InApp,
    Push,
    Email,
    Sms,
}

/// Type tag of a frame carried over the WebSocket channel.
///
/// Unrecognised tags deserialize to [`MessageType::Unknown`] so newer clients
/// never break older servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    // server -> client
    ConnectionEstablished,
    NewMessage,
    OrderStatusUpdate,
    PriceAlertTriggered,
    DisputeUpdate,
    Notification,
    // client -> server
    JoinConversation,
    LeaveConversation,
    ChatMessage,
    TypingStart,
    TypingStop,
    #[serde(other)]
    Unknown,
}

/// A frame on the WebSocket channel.
///
/// Wire shape: `{"type": ..., "data": {...}, "timestamp": ISO-8601, "user_id"?: ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Message {
    /// Create a server-originated message stamped with the current time.
    pub fn new(kind: MessageType, data: Map<String, Value>) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
            user_id: None,
        }
    }

    /// Create a message from a JSON value; non-object values yield empty data.
    pub fn from_value(kind: MessageType, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(kind, data)
    }

    /// Read a conversation id from `data.conversation_id`.
    ///
    /// Accepts JSON strings and integers; anything else is rejected.
    pub fn conversation_id(&self) -> Option<String> {
        match self.data.get("conversation_id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Identity resolved from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: String,
    pub user_type: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_type_is_tolerated() {
        let json = r#"{"type":"reaction_added","data":{"emoji":"+1"}}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, MessageType::Unknown);
        assert_eq!(msg.data["emoji"], "+1");
    }

    #[test]
    fn missing_data_and_timestamp_default() {
        let msg: Message = serde_json::from_str(r#"{"type":"typing_start"}"#).unwrap();
        assert_eq!(msg.kind, MessageType::TypingStart);
        assert!(msg.data.is_empty());
        assert!(msg.user_id.is_none());
    }

    #[test]
    fn user_id_omitted_when_absent() {
        let msg = Message::from_value(MessageType::Notification, serde_json::json!({"a": 1}));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"notification""#));
        assert!(!json.contains("user_id"));
    }

    #[test]
    fn conversation_id_accepts_strings_and_integers() {
        let s = Message::from_value(
            MessageType::ChatMessage,
            serde_json::json!({"conversation_id": "abc"}),
        );
        assert_eq!(s.conversation_id().as_deref(), Some("abc"));

        let n = Message::from_value(
            MessageType::ChatMessage,
            serde_json::json!({"conversation_id": 42}),
        );
        assert_eq!(n.conversation_id().as_deref(), Some("42"));

        let bad = Message::from_value(
            MessageType::ChatMessage,
            serde_json::json!({"conversation_id": {"nested": true}}),
        );
        assert!(bad.conversation_id().is_none());

        let empty = Message::from_value(
            MessageType::ChatMessage,
            serde_json::json!({"conversation_id": ""}),
        );
        assert!(empty.conversation_id().is_none());
    }

    #[test]
    fn message_type_display_matches_wire_name() {
        assert_eq!(MessageType::PriceAlertTriggered.to_string(), "price_alert_triggered");
        assert_eq!(NotificationChannel::InApp.to_string(), "in_app");
    }
}
