// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every pluggable backend.

use async_trait::async_trait;

use crate::error::AutoboyError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle for stores, notification sinks and the
/// metrics exporter.
///
/// The binary health-checks every adapter at startup and calls `shutdown`
/// once the HTTP server has drained.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Which role this adapter fills.
    fn adapter_type(&self) -> AdapterType;

    /// Current health of the backing resource.
    async fn health_check(&self) -> Result<HealthStatus, AutoboyError>;

    /// Release held resources. Called once during graceful shutdown.
    async fn shutdown(&self) -> Result<(), AutoboyError>;
}
