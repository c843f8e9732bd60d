// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the AutoBoy backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! startup with a suggestion instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level AutoBoy configuration.
///
/// Every section is optional and defaults to values suitable for a single
/// local node.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutoboyConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Messaging hub limits and deadlines.
    #[serde(default)]
    pub hub: HubConfig,

    /// Price-alert engine scheduling.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Document store backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Token validation and session checks.
    #[serde(default)]
    pub auth: AuthConfig,

    /// SMTP email channel.
    #[serde(default)]
    pub email: EmailConfig,

    /// HTTP SMS channel.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Prometheus metrics export.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Messaging hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Origins allowed to open a WebSocket. `*` allows any origin.
    #[serde(default)]
    pub ws_origin_allowlist: Vec<String>,

    /// Seconds without a pong before the connection is closed.
    #[serde(default = "default_read_deadline_seconds")]
    pub read_deadline_seconds: u64,

    /// Per-frame write deadline.
    #[serde(default = "default_write_deadline_seconds")]
    pub write_deadline_seconds: u64,

    /// Interval between server pings. Must be shorter than the read deadline.
    #[serde(default = "default_ping_interval_seconds")]
    pub ping_interval_seconds: u64,

    /// Outbound queue depth per client. A full outbox evicts the client.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    /// Inbound frames accepted per user per rolling second.
    #[serde(default = "default_inbound_rate")]
    pub inbound_rate_per_user_per_second: u32,

    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Deadline for the conversation membership lookup.
    #[serde(default = "default_acl_timeout_seconds")]
    pub acl_timeout_seconds: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ws_origin_allowlist: Vec::new(),
            read_deadline_seconds: default_read_deadline_seconds(),
            write_deadline_seconds: default_write_deadline_seconds(),
            ping_interval_seconds: default_ping_interval_seconds(),
            outbox_capacity: default_outbox_capacity(),
            inbound_rate_per_user_per_second: default_inbound_rate(),
            max_message_bytes: default_max_message_bytes(),
            acl_timeout_seconds: default_acl_timeout_seconds(),
        }
    }
}

impl HubConfig {
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_seconds)
    }

    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.write_deadline_seconds)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    pub fn acl_timeout(&self) -> Duration {
        Duration::from_secs(self.acl_timeout_seconds)
    }
}

fn default_read_deadline_seconds() -> u64 {
    60
}

fn default_write_deadline_seconds() -> u64 {
    10
}

fn default_ping_interval_seconds() -> u64 {
    54
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_inbound_rate() -> u32 {
    10
}

fn default_max_message_bytes() -> usize {
    512
}

fn default_acl_timeout_seconds() -> u64 {
    5
}

/// Price-alert engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsConfig {
    /// Run the scheduler and price watcher.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_alert_eval_interval_seconds")]
    pub alert_eval_interval_seconds: u64,

    /// Price points kept per alert (at most 64).
    #[serde(default = "default_alert_history_points")]
    pub alert_history_points: usize,

    /// Alerts evaluated concurrently within one pass.
    #[serde(default = "default_max_concurrent_evaluations")]
    pub max_concurrent_evaluations: usize,

    /// Re-evaluate a product's alerts as soon as its document changes.
    #[serde(default = "default_true")]
    pub watch_price_changes: bool,

    /// Deadline for each email/SMS dispatch.
    #[serde(default = "default_notification_timeout_seconds")]
    pub notification_timeout_seconds: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_eval_interval_seconds: default_alert_eval_interval_seconds(),
            alert_history_points: default_alert_history_points(),
            max_concurrent_evaluations: default_max_concurrent_evaluations(),
            watch_price_changes: true,
            notification_timeout_seconds: default_notification_timeout_seconds(),
        }
    }
}

impl AlertsConfig {
    pub fn eval_interval(&self) -> Duration {
        Duration::from_secs(self.alert_eval_interval_seconds)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_seconds)
    }
}

fn default_true() -> bool {
    true
}

fn default_alert_eval_interval_seconds() -> u64 {
    30
}

fn default_alert_history_points() -> usize {
    64
}

fn default_max_concurrent_evaluations() -> usize {
    16
}

fn default_notification_timeout_seconds() -> u64 {
    15
}

/// Which document store implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Deadline applied to each store call made by the core.
    #[serde(default = "default_operation_timeout_seconds")]
    pub operation_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            operation_timeout_seconds: default_operation_timeout_seconds(),
        }
    }
}

impl StorageConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("autoboy").join("autoboy.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("autoboy.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_operation_timeout_seconds() -> u64 {
    10
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret shared with the token issuer. Required by `serve`.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Also require an active row in the `sessions` collection.
    #[serde(default = "default_true")]
    pub require_active_session: bool,

    /// `user_type` claim that grants access to admin endpoints.
    #[serde(default = "default_admin_user_type")]
    pub admin_user_type: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            require_active_session: true,
            admin_user_type: default_admin_user_type(),
        }
    }
}

fn default_admin_user_type() -> String {
    "admin".to_string()
}

/// SMTP email configuration. Without `smtp_host` emails are only logged.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub from_address: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// HTTP SMS gateway configuration. Without `api_url` SMS are only logged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub from_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
