// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connected clients and their outboxes.

use std::collections::BTreeSet;
use std::sync::Arc;

use autoboy_core::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Receiving half of a client outbox, drained by the connection's writer.
pub type OutboxReceiver = mpsc::Receiver<Arc<Message>>;

/// A connection about to be registered with the hub.
///
/// The outbox sender moves into the registry on registration, so the
/// registry is the only producer: unregistering closes the outbox.
/// Evicting a slow consumer also cancels its [`cancellation`](Self::cancellation)
/// token.
pub struct Client {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) outbox: mpsc::Sender<Arc<Message>>,
    pub(crate) cancel: CancellationToken,
}

impl Client {
    /// Create a client with a bounded outbox of `capacity` messages.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        capacity: usize,
    ) -> (Self, OutboxReceiver) {
        let (outbox, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: id.into(),
                user_id: user_id.into(),
                outbox,
                cancel: CancellationToken::new(),
            },
            rx,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Token the connection's tasks watch; cancelled when the hub evicts it.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Registry-side state of a registered client.
pub(crate) struct ClientEntry {
    pub(crate) user_id: String,
    pub(crate) outbox: mpsc::Sender<Arc<Message>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) rooms: BTreeSet<String>,
    pub(crate) connected_at: DateTime<Utc>,
    pub(crate) last_pong_at: DateTime<Utc>,
}

impl ClientEntry {
    pub(crate) fn new(
        user_id: String,
        outbox: mpsc::Sender<Arc<Message>>,
        cancel: CancellationToken,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            outbox,
            cancel,
            rooms: BTreeSet::new(),
            connected_at: now,
            last_pong_at: now,
        }
    }

    pub(crate) fn info(&self, id: &str) -> ClientInfo {
        ClientInfo {
            id: id.to_string(),
            user_id: self.user_id.clone(),
            rooms: self.rooms.iter().cloned().collect(),
            connected_at: self.connected_at,
            last_pong_at: self.last_pong_at,
        }
    }
}

/// Point-in-time snapshot of a registered client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub user_id: String,
    pub rooms: Vec<String>,
    pub connected_at: DateTime<Utc>,
    pub last_pong_at: DateTime<Utc>,
}
