// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown: signal handling and draining in-flight turns.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Wait up to `timeout` for in-flight turns, then abort the rest.
pub async fn drain_turns(turns: &mut JoinSet<()>, timeout: Duration) {
    if turns.is_empty() {
        info!("no in-flight turns to drain");
        return;
    }

    info!(count = turns.len(), "waiting for in-flight turns to complete");
    let drained = tokio::time::timeout(timeout, async {
        while let Some(joined) = turns.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "turn task failed during drain");
            }
        }
    })
    .await;

    match drained {
        Ok(()) => info!("all turns drained"),
        Err(_) => {
            warn!(remaining = turns.len(), "drain timeout reached, aborting remaining turns");
            turns.abort_all();
        }
    }
}
