//! Signal handling for graceful shutdown and manual rescans

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::events::Trigger;

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    /// Register the signal handlers
    pub fn new() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())
                .context("failed to register SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?,
        })
    }

    /// Wait for a shutdown signal
    pub async fn wait(&mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
            }
        }
    }
}

/// Turn every SIGHUP into a rescan
///
/// Returns when the engine goes away.
pub async fn forward_hangups(trigger_tx: mpsc::Sender<Trigger>) -> Result<()> {
    let mut sighup = signal(SignalKind::hangup()).context("failed to register SIGHUP handler")?;

    while sighup.recv().await.is_some() {
        info!("received SIGHUP, rescanning displays");
        if trigger_tx.send(Trigger::TopologyChanged).await.is_err() {
            break;
        }
    }
    Ok(())
}
