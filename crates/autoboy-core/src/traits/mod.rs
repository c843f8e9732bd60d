// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams between the hub, the alert engine and
//! their backends.
//!
//! Async traits use `#[async_trait]` so they stay object safe behind `Arc<dyn _>`.

pub mod adapter;
pub mod auth;
pub mod notify;
pub mod push;
pub mod store;

pub use adapter::PluginAdapter;
pub use auth::{SessionLookup, TokenValidator};
pub use notify::{NotificationPayload, NotificationSink, Recipient};
pub use push::UserPush;
pub use store::{ChangeEvent, ChangeKind, ChangeStream, DocumentStore, UpdateResult};
