// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Price-alert evaluation engine.
//!
//! Alerts live in the document store and move through a small state machine
//! (`active`, `triggered`, `expired`, `cancelled`). The [`AlertEngine`]
//! reconciles active alerts against current product prices; every status
//! change is a compare-and-set, so any number of concurrent passes produce
//! at most one trigger, and at most one notification, per alert activation.
//!
//! Pushes reach the owner's live sockets through [`UserPush`]; the engine
//! knows nothing else about the messaging hub.

pub mod dispatch;
pub mod engine;
pub mod model;
pub mod repo;
pub mod scheduler;

use std::sync::Arc;

use autoboy_config::{AlertsConfig, StorageConfig};
use autoboy_core::{Clock, DocumentStore, NotificationSink, UserPush};

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use engine::{AlertEngine, EvaluationReport};
pub use model::{
    AlertStatus, Direction, NewAlert, NotificationPreferences, NotificationRecord, PriceAlert,
    PricePoint, Product, UserContact,
};
pub use repo::AlertRepository;
pub use scheduler::{schedule_loop, watch_prices};

/// Upper bound on `price_history` length.
pub const MAX_HISTORY_POINTS: usize = 64;

/// Collaborators the engine is wired to.
pub struct EngineDeps {
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
    pub push: Arc<dyn UserPush>,
    pub email: Arc<dyn NotificationSink>,
    pub sms: Arc<dyn NotificationSink>,
}

/// Build an engine from configuration.
pub fn build_engine(alerts: &AlertsConfig, storage: &StorageConfig, deps: EngineDeps) -> AlertEngine {
    let repo = AlertRepository::new(
        deps.store,
        deps.clock,
        storage.operation_timeout(),
        alerts.alert_history_points.min(MAX_HISTORY_POINTS),
    );
    let dispatcher = Dispatcher::new(
        repo.clone(),
        deps.push,
        deps.email,
        deps.sms,
        alerts.notification_timeout(),
    );
    AlertEngine::new(repo, dispatcher, alerts.max_concurrent_evaluations)
}
