// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the AutoBoy marketplace backend.
//!
//! Holds what the messaging hub and the price-alert engine share: the error
//! type, wire message types, the clock and identifier sources, the document
//! model, and the collaborator traits every backend implements.

pub mod clock;
pub mod deadline;
pub mod document;
pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deadline::within;
pub use document::{Document, Filter, FindOptions, SortOrder, Stage, Update};
pub use error::AutoboyError;
pub use types::{AdapterType, Claims, HealthStatus, Message, MessageType, NotificationChannel};

pub use traits::{
    ChangeEvent, ChangeKind, ChangeStream, DocumentStore, NotificationPayload, NotificationSink,
    PluginAdapter, Recipient, SessionLookup, TokenValidator, UpdateResult, UserPush,
};
