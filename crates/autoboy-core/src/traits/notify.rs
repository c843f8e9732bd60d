// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification channels (email, SMS).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AutoboyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::NotificationChannel;

/// Where a notification goes. Resolved from the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// What a notification says.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A one-shot, best-effort delivery channel.
///
/// No retry contract: a failed `send` is reported to the caller and
/// forgotten.
#[async_trait]
pub trait NotificationSink: PluginAdapter {
    /// The channel this sink delivers on.
    fn channel(&self) -> NotificationChannel;

    async fn send(
        &self,
        recipient: &Recipient,
        payload: &NotificationPayload,
    ) -> Result<(), AutoboyError>;
}
