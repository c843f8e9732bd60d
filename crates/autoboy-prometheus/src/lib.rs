// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the AutoBoy backend.
//!
//! Components record through the `metrics` facade via [`recording`]; this
//! crate installs the Prometheus recorder and renders the text exposition
//! served at `GET /metrics`. Without an installed recorder every helper is
//! a no-op.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use autoboy_core::{AdapterType, AutoboyError, HealthStatus, PluginAdapter};

pub use recording::{
    record_alert_transition, record_dropped, record_evaluation, record_notification,
    record_ws_message, set_connected_clients, set_rooms,
};

/// Installed Prometheus recorder.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn new() -> Result<Self, AutoboyError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            AutoboyError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Render collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// A cloneable render function for the HTTP layer.
    pub fn renderer(&self) -> impl Fn() -> String + Send + Sync + 'static {
        let handle = self.handle.clone();
        move || handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, AutoboyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AutoboyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn helpers_render_through_a_local_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            recording::register_metrics();
            set_connected_clients(3);
            record_ws_message("inbound", "chat_message");
            record_dropped("slow_consumer");
            record_alert_transition("triggered");
            record_notification("email", "failed");
            record_evaluation(Duration::from_millis(20));
        });

        let text = handle.render();
        assert!(text.contains("autoboy_ws_connected_clients 3"));
        assert!(text.contains(r#"autoboy_ws_messages_total{direction="inbound",type="chat_message"} 1"#));
        assert!(text.contains(r#"autoboy_ws_dropped_total{reason="slow_consumer"} 1"#));
        assert!(text.contains(r#"autoboy_alert_transitions_total{to="triggered"} 1"#));
        assert!(text.contains(r#"autoboy_notifications_total{channel="email",outcome="failed"} 1"#));
        assert!(text.contains("autoboy_alert_evaluation_seconds"));
    }

    #[test]
    fn helpers_without_recorder_are_noops() {
        set_rooms(5);
        record_dropped("rate_limited");
    }
}
