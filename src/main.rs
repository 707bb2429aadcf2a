//! monitor-control-daemon: media keys and sliders for external monitors
//!
//! This daemon runs as a user service and provides:
//! - A roster of DDC/CI capable displays, rebuilt on hotplug
//! - Media key registrations gated by the default audio output
//! - Brightness, volume and contrast control over I2C via ddcutil
//! - IPC server for UI clients and desktop key bindings

mod config;
mod context;
mod dispatch;
mod display;
mod engine;
mod events;
mod ipc;
mod keytap;
mod lifecycle;
mod platform;
mod prefs;
mod routing;
mod topology;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::context::AppContext;
use crate::engine::Engine;
use crate::events::EngineEvent;
use crate::ipc::{Server, ServerContext};
use crate::keytap::{GateTapFactory, KeyGate, KeyTapController};
use crate::lifecycle::{forward_hangups, ShutdownSignal};
use crate::platform::{watch_audio_route, watch_topology, DdcutilLinks, DrmScreens, PactlAudio};
use crate::prefs::{JsonPreferences, Preferences};
use crate::routing::RoutingPolicy;
use crate::topology::SharedRoster;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "monitor-control-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.drm_root, "configuration loaded");

    let store = JsonPreferences::open(&config.prefs_path).context("failed to load preferences")?;
    let prefs = Preferences::new(Arc::new(store));
    prefs
        .apply_first_launch_defaults()
        .context("failed to write default preferences")?;

    let screens = Arc::new(DrmScreens::new(&config.drm_root));
    let ctx = AppContext {
        prefs: prefs.clone(),
        links: Arc::new(DdcutilLinks::new(&config.drm_root)),
        screens: screens.clone(),
        audio: Arc::new(PactlAudio::new()),
    };

    let mut shutdown = ShutdownSignal::new()?;

    // Watchers, IPC server -> engine
    let (trigger_tx, trigger_rx) = mpsc::channel(64);
    // Engine -> subscribed IPC clients
    let (event_tx, _) = broadcast::channel::<EngineEvent>(64);

    let gate = KeyGate::new();
    let keytap = Arc::new(KeyTapController::new(Arc::new(GateTapFactory::new(
        gate.clone(),
    ))));
    let mut engine = Engine::new(
        ctx,
        RoutingPolicy::new(config.audio_match),
        SharedRoster::new(),
        keytap.clone(),
        event_tx.clone(),
    );

    let server = Server::new(
        &config.socket_path,
        ServerContext {
            roster: engine.roster().clone(),
            prefs,
            gate,
            trigger_tx: trigger_tx.clone(),
            event_tx: event_tx.clone(),
            start_time: Instant::now(),
        },
    )?;

    let topology = tokio::spawn(watch_topology(
        screens,
        config.topology_poll,
        trigger_tx.clone(),
    ));
    let audio_tx = trigger_tx.clone();
    let audio = tokio::spawn(async move {
        if let Err(e) = watch_audio_route("pactl", audio_tx).await {
            warn!(?e, "audio route watcher stopped");
        }
    });
    let hangups = tokio::spawn(async move {
        if let Err(e) = forward_hangups(trigger_tx).await {
            warn!(?e, "manual rescan via SIGHUP unavailable");
        }
    });

    let mut log_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the engine (processes triggers)
        _ = engine.run(trigger_rx) => {
            info!("engine exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Trace engine events
        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event) => debug!(%event, "engine event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event log lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event log exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    topology.abort();
    audio.abort();
    hangups.abort();
    keytap.stop();
    server.shutdown().await;

    info!("monitor-control-daemon stopped");

    Ok(())
}
