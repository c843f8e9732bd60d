// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and recording helpers.

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Describe every AutoBoy series. Called once after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!("autoboy_ws_connected_clients", "Registered WebSocket clients");
    describe_gauge!("autoboy_ws_rooms", "Non-empty conversation rooms");
    describe_counter!(
        "autoboy_ws_messages_total",
        "WebSocket frames by direction and type"
    );
    describe_counter!(
        "autoboy_ws_dropped_total",
        "Inbound frames or clients dropped, by reason"
    );
    describe_counter!(
        "autoboy_alert_transitions_total",
        "Price alert state transitions by target state"
    );
    describe_counter!(
        "autoboy_notifications_total",
        "Alert notification attempts by channel and outcome"
    );
    describe_histogram!(
        "autoboy_alert_evaluation_seconds",
        "Duration of a full alert evaluation pass"
    );
}

pub fn set_connected_clients(count: usize) {
    metrics::gauge!("autoboy_ws_connected_clients").set(count as f64);
}

pub fn set_rooms(count: usize) {
    metrics::gauge!("autoboy_ws_rooms").set(count as f64);
}

/// `direction` is `inbound` or `outbound`.
pub fn record_ws_message(direction: &'static str, kind: &str) {
    metrics::counter!(
        "autoboy_ws_messages_total",
        "direction" => direction,
        "type" => kind.to_string()
    )
    .increment(1);
}

/// Reasons: `slow_consumer`, `rate_limited`, `acl_denied`, `invalid_frame`.
pub fn record_dropped(reason: &'static str) {
    metrics::counter!("autoboy_ws_dropped_total", "reason" => reason).increment(1);
}

pub fn record_alert_transition(to: &'static str) {
    metrics::counter!("autoboy_alert_transitions_total", "to" => to).increment(1);
}

pub fn record_notification(channel: &str, outcome: &'static str) {
    metrics::counter!(
        "autoboy_notifications_total",
        "channel" => channel.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_evaluation(elapsed: Duration) {
    metrics::histogram!("autoboy_alert_evaluation_seconds").record(elapsed.as_secs_f64());
}
