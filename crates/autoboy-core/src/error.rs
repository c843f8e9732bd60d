// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the AutoBoy backend core.

use thiserror::Error;

/// The primary error type used across all AutoBoy trait seams and core operations.
#[derive(Debug, Error)]
pub enum AutoboyError {
    /// Configuration errors (invalid values, missing required settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Store backend errors (connection failure, query failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A document was not found where one was required.
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// An insert collided with an existing `_id`.
    #[error("duplicate document {collection}/{id}")]
    Duplicate { collection: String, id: String },

    /// Token missing, malformed, expired, or the origin is not allowed.
    #[error("unauthorized connection: {0}")]
    Unauthorized(String),

    /// A client id is already present in the hub registry.
    #[error("client {client_id} is already registered")]
    AlreadyRegistered { client_id: String },

    /// A targeted hub operation referenced a client that is not registered.
    #[error("unknown client {client_id}")]
    UnknownClient { client_id: String },

    /// A client was evicted because its outbox was full.
    #[error("delivery dropped for client {client_id}: outbox full")]
    DeliveryDropped { client_id: String },

    /// The sender is not a participant of the target conversation.
    #[error("user {user_id} is not a participant of conversation {conversation_id}")]
    AclDenied {
        user_id: String,
        conversation_id: String,
    },

    /// A conditional alert update lost against a concurrent evaluator.
    #[error("trigger race lost for alert {alert_id}")]
    TriggerRaceLost { alert_id: String },

    /// A state machine transition that is not allowed.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A notification channel failed to deliver.
    #[error("{channel} notification failed: {message}")]
    Notification { channel: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AutoboyError {
    /// Wraps any error as a store failure.
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AutoboyError::Store {
            source: source.into(),
        }
    }

    /// Whether the failure is transient (store unavailable or timed out) and
    /// worth retrying on the next evaluation pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, AutoboyError::Store { .. } | AutoboyError::Timeout { .. })
    }
}

impl From<serde_json::Error> for AutoboyError {
    fn from(e: serde_json::Error) -> Self {
        AutoboyError::Store {
            source: Box::new(e),
        }
    }
}
