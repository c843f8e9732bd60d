// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `autoboy serve` command implementation.
//!
//! Opens the document store, builds the messaging hub and the price-alert
//! engine, spawns the alert scheduler and price watcher, and serves HTTP
//! until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use autoboy_alerts::{EngineDeps, build_engine, schedule_loop, watch_prices};
use autoboy_config::AutoboyConfig;
use autoboy_core::{
    AutoboyError, DocumentStore, HealthStatus, NotificationSink, SessionLookup, SystemClock,
    UserPush,
};
use autoboy_hub::{
    ConversationAcl, HealthState, Hub, HubSettings, HubState, JwtValidator, OriginPolicy,
    StoreSessionLookup,
};
use autoboy_prometheus::PrometheusAdapter;
use tracing::{error, info, warn};

use crate::shutdown;

/// How long background tasks get to stop after the server has drained.
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the `autoboy serve` command.
pub async fn run_serve(config: AutoboyConfig) -> Result<(), AutoboyError> {
    init_tracing(&config.server.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting autoboy serve");

    let secret = config.auth.jwt_secret.clone().ok_or_else(|| {
        AutoboyError::Config("auth.jwt_secret must be set to serve (AUTOBOY_AUTH_JWT_SECRET)".into())
    })?;

    // Metrics recorder first, so startup gauges land in it.
    let prometheus = if config.prometheus.enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                warn!(error = %e, "prometheus disabled");
                None
            }
        }
    } else {
        info!("prometheus metrics disabled");
        None
    };

    let store = autoboy_store::open_store(&config.storage).await?;
    let email = autoboy_notify::email_sink(&config.email)?;
    let sms = autoboy_notify::sms_sink(&config.sms)?;
    check_health(store.as_ref(), &[&email, &sms]).await?;

    // Hub.
    let settings = HubSettings::from_config(&config.hub);
    let hub = Arc::new(Hub::new(settings.inbound_rate_per_second));
    let sessions: Option<Arc<dyn SessionLookup>> = if config.auth.require_active_session {
        Some(Arc::new(StoreSessionLookup::new(
            store.clone(),
            Arc::new(SystemClock),
            config.storage.operation_timeout(),
        )))
    } else {
        warn!("active-session check disabled; any unexpired token may connect");
        None
    };
    if config.hub.ws_origin_allowlist.is_empty() {
        info!("no ws_origin_allowlist; browser origins will be refused");
    }
    let state = HubState {
        hub: hub.clone(),
        acl: Arc::new(ConversationAcl::new(store.clone(), settings.acl_timeout)),
        tokens: Arc::new(JwtValidator::new(secret.as_bytes())),
        sessions,
        origins: OriginPolicy::new(&config.hub.ws_origin_allowlist),
        settings,
        admin_user_type: config.auth.admin_user_type.clone(),
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: prometheus
                .as_ref()
                .map(|p| Arc::new(p.renderer()) as Arc<dyn Fn() -> String + Send + Sync>),
        },
    };

    // Alert engine, pushing through the hub.
    let engine = Arc::new(build_engine(
        &config.alerts,
        &config.storage,
        EngineDeps {
            store: store.clone(),
            clock: Arc::new(SystemClock),
            push: hub.clone() as Arc<dyn UserPush>,
            email: email.clone(),
            sms: sms.clone(),
        },
    ));

    let cancel = shutdown::install_signal_handler()?;
    let mut tasks = Vec::new();
    if config.alerts.enabled {
        tasks.push((
            "alert-scheduler",
            tokio::spawn(schedule_loop(
                engine.clone(),
                config.alerts.eval_interval(),
                cancel.clone(),
            )),
        ));
        if config.alerts.watch_price_changes {
            tasks.push((
                "price-watcher",
                tokio::spawn(watch_prices(engine.clone(), cancel.clone())),
            ));
        }
        info!(
            interval_secs = config.alerts.alert_eval_interval_seconds,
            watch = config.alerts.watch_price_changes,
            "price-alert engine enabled"
        );
    } else {
        info!("price-alert engine disabled");
    }

    let listener = autoboy_hub::bind(&config.server.host, config.server.port).await?;
    let served = autoboy_hub::serve(listener, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "http server stopped with an error");
    }

    // Whatever stopped the server, stop everything else.
    cancel.cancel();
    shutdown::drain_tasks(tasks, TASK_DRAIN_TIMEOUT).await;

    for sink in [&email, &sms] {
        if let Err(e) = sink.shutdown().await {
            warn!(sink = sink.name(), error = %e, "notification sink shutdown failed");
        }
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "store shutdown failed");
    }

    info!("autoboy serve shutdown complete");
    served
}

/// Fail startup on an unhealthy store; sinks only warn.
async fn check_health(
    store: &dyn DocumentStore,
    sinks: &[&Arc<dyn NotificationSink>],
) -> Result<(), AutoboyError> {
    match store.health_check().await? {
        HealthStatus::Healthy => info!(store = store.name(), "store healthy"),
        HealthStatus::Degraded(reason) => warn!(store = store.name(), %reason, "store degraded"),
        HealthStatus::Unhealthy(reason) => {
            return Err(AutoboyError::Internal(format!(
                "store {} is unhealthy: {reason}",
                store.name()
            )));
        }
    }

    for sink in sinks {
        match sink.health_check().await {
            Ok(HealthStatus::Healthy) => info!(sink = sink.name(), "notification sink healthy"),
            Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
                warn!(sink = sink.name(), %reason, "notification sink not healthy")
            }
            Err(e) => warn!(sink = sink.name(), error = %e, "notification sink health check failed"),
        }
    }
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("autoboy={log_level},warn")));

    // A second init (tests) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
