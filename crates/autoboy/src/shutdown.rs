// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! SIGTERM and SIGINT (Ctrl+C) cancel a [`CancellationToken`] watched by
//! the HTTP server, the alert scheduler and the price watcher.

use std::time::Duration;

use autoboy_core::AutoboyError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> Result<CancellationToken, AutoboyError> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    #[cfg(unix)]
    let mut sigterm = {
        use tokio::signal::unix::{SignalKind, signal};
        signal(SignalKind::terminate())
            .map_err(|e| AutoboyError::Internal(format!("failed to install SIGTERM handler: {e}")))?
    };

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
                _ = token_clone.cancelled() => {
                    debug!("shutdown requested internally");
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => debug!("shutdown requested internally"),
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    Ok(token)
}

/// Wait for background tasks to finish, aborting any still running once
/// `timeout` has passed. All tasks share the one deadline.
pub async fn drain_tasks(tasks: Vec<(&'static str, JoinHandle<()>)>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    for (name, handle) in tasks {
        let abort = handle.abort_handle();
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(())) => debug!(task = name, "background task stopped"),
            Ok(Err(e)) => warn!(task = name, error = %e, "background task ended abnormally"),
            Err(_) => {
                warn!(task = name, "background task did not stop in time, aborting");
                abort.abort();
            }
        }
    }
}
