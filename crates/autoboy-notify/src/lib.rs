// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification sinks.
//!
//! Each channel falls back to a [`LogSink`] when it is not configured, so the
//! alert engine always has a sink to call.

pub mod email;
pub mod log_sink;
pub mod sms;

use std::sync::Arc;

use autoboy_config::{EmailConfig, SmsConfig};
use autoboy_core::{AutoboyError, NotificationChannel, NotificationSink};
use tracing::info;

pub use email::SmtpEmailSink;
pub use log_sink::LogSink;
pub use sms::HttpSmsSink;

/// Build the email sink: SMTP when `smtp_host` is set, otherwise log-only.
pub fn email_sink(config: &EmailConfig) -> Result<Arc<dyn NotificationSink>, AutoboyError> {
    match SmtpEmailSink::from_config(config)? {
        Some(sink) => {
            info!(host = ?config.smtp_host, port = config.smtp_port, "email via SMTP");
            Ok(Arc::new(sink))
        }
        None => {
            info!("email not configured, notifications will be logged");
            Ok(Arc::new(LogSink::new(NotificationChannel::Email)))
        }
    }
}

/// Build the SMS sink: HTTP gateway when `api_url` is set, otherwise log-only.
pub fn sms_sink(config: &SmsConfig) -> Result<Arc<dyn NotificationSink>, AutoboyError> {
    match HttpSmsSink::from_config(config)? {
        Some(sink) => {
            info!(url = ?config.api_url, "sms via HTTP gateway");
            Ok(Arc::new(sink))
        }
        None => {
            info!("sms not configured, notifications will be logged");
            Ok(Arc::new(LogSink::new(NotificationChannel::Sms)))
        }
    }
}

pub(crate) fn notification_error(channel: NotificationChannel, message: impl Into<String>) -> AutoboyError {
    AutoboyError::Notification {
        channel: channel.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoboy_core::PluginAdapter;

    #[test]
    fn unconfigured_channels_fall_back_to_logging() {
        let email = email_sink(&EmailConfig::default()).unwrap();
        assert_eq!(email.name(), "log-email");
        assert_eq!(email.channel(), NotificationChannel::Email);

        let sms = sms_sink(&SmsConfig::default()).unwrap();
        assert_eq!(sms.name(), "log-sms");
        assert_eq!(sms.channel(), NotificationChannel::Sms);
    }

    #[test]
    fn configured_sms_uses_http_gateway() {
        let config = SmsConfig {
            api_url: Some("http://127.0.0.1:9/messages".into()),
            account_id: Some("AC1".into()),
            auth_token: Some("secret".into()),
            from_number: Some("+15550000000".into()),
        };
        assert_eq!(sms_sink(&config).unwrap().name(), "http-sms");
    }
}
