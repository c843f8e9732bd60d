// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks cross-field and range constraints serde cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{AutoboyConfig, StorageBackend};

/// Upper bound on the per-alert price history ring.
pub const MAX_HISTORY_POINTS: usize = 64;

/// Minimum HS256 secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 16;

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &AutoboyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }

    let hub = &config.hub;
    for (key, value) in [
        ("hub.read_deadline_seconds", hub.read_deadline_seconds),
        ("hub.write_deadline_seconds", hub.write_deadline_seconds),
        ("hub.ping_interval_seconds", hub.ping_interval_seconds),
        ("hub.outbox_capacity", hub.outbox_capacity as u64),
        (
            "hub.inbound_rate_per_user_per_second",
            u64::from(hub.inbound_rate_per_user_per_second),
        ),
        ("hub.max_message_bytes", hub.max_message_bytes as u64),
        ("hub.acl_timeout_seconds", hub.acl_timeout_seconds),
        (
            "alerts.alert_eval_interval_seconds",
            config.alerts.alert_eval_interval_seconds,
        ),
        (
            "alerts.alert_history_points",
            config.alerts.alert_history_points as u64,
        ),
        (
            "alerts.max_concurrent_evaluations",
            config.alerts.max_concurrent_evaluations as u64,
        ),
        (
            "alerts.notification_timeout_seconds",
            config.alerts.notification_timeout_seconds,
        ),
        (
            "storage.operation_timeout_seconds",
            config.storage.operation_timeout_seconds,
        ),
    ] {
        if value == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    if hub.ping_interval_seconds >= hub.read_deadline_seconds {
        fail(format!(
            "hub.ping_interval_seconds ({}) must be less than hub.read_deadline_seconds ({})",
            hub.ping_interval_seconds, hub.read_deadline_seconds
        ));
    }

    for origin in &hub.ws_origin_allowlist {
        let valid = origin == "*"
            || origin.starts_with("http://")
            || origin.starts_with("https://");
        if !valid {
            fail(format!(
                "hub.ws_origin_allowlist entry `{origin}` must be `*` or start with http:// or https://"
            ));
        }
    }

    if config.alerts.alert_history_points > MAX_HISTORY_POINTS {
        fail(format!(
            "alerts.alert_history_points must be at most {MAX_HISTORY_POINTS}, got {}",
            config.alerts.alert_history_points
        ));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Some(secret) = &config.auth.jwt_secret
        && secret.len() < MIN_JWT_SECRET_BYTES
    {
        fail(format!(
            "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &AutoboyConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&AutoboyConfig::default()).is_ok());
    }

    #[test]
    fn ping_must_be_shorter_than_read_deadline() {
        let mut config = AutoboyConfig::default();
        config.hub.ping_interval_seconds = 60;
        let errors = messages(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ping_interval_seconds"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = AutoboyConfig::default();
        config.hub.outbox_capacity = 0;
        config.alerts.alert_history_points = 65;
        config.hub.ws_origin_allowlist = vec!["example.com".into()];
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut config = AutoboyConfig::default();
        config.auth.jwt_secret = Some("short".into());
        assert!(messages(&config)[0].contains("jwt_secret"));

        config.auth.jwt_secret = Some("0123456789abcdef".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn memory_backend_ignores_database_path() {
        let mut config = AutoboyConfig::default();
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn wildcard_and_http_origins_accepted() {
        let mut config = AutoboyConfig::default();
        config.hub.ws_origin_allowlist = vec![
            "*".into(),
            "https://autoboy.example".into(),
            "http://localhost:3000".into(),
        ];
        assert!(validate_config(&config).is_ok());
    }
}
