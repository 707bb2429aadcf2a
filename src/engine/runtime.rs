//! Engine runtime: the single owner of derived state
//!
//! Triggers are handled one at a time. Rescans and key set recomputation
//! run on the blocking pool and are awaited; display transactions are
//! spawned onto the blocking pool and never awaited, so slow hardware cannot
//! hold up the next trigger.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::dispatch;
use crate::display::{DisplayId, Feature};
use crate::events::{EngineEvent, EventRelay, Trigger};
use crate::keytap::{KeySet, KeyTapController, MediaKeyEvent};
use crate::prefs::PrefKey;
use crate::routing::RoutingPolicy;
use crate::topology::{SharedRoster, TopologyScanner};

/// Owns the roster and the key-tap registration
pub struct Engine {
    ctx: AppContext,
    scanner: TopologyScanner,
    policy: RoutingPolicy,
    roster: SharedRoster,
    keytap: Arc<KeyTapController>,
    event_tx: broadcast::Sender<EngineEvent>,
    relay: Arc<EventRelay>,
}

impl Engine {
    pub fn new(
        ctx: AppContext,
        policy: RoutingPolicy,
        roster: SharedRoster,
        keytap: Arc<KeyTapController>,
        event_tx: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            scanner: TopologyScanner::new(ctx.clone()),
            relay: Arc::new(EventRelay::new(event_tx.clone())),
            ctx,
            policy,
            roster,
            keytap,
            event_tx,
        }
    }

    pub fn roster(&self) -> &SharedRoster {
        &self.roster
    }

    /// Scan, register keys, then process triggers until the channel closes
    pub async fn run(&mut self, mut trigger_rx: mpsc::Receiver<Trigger>) {
        info!(audio_match = ?self.policy.audio_match(), "engine started");

        self.rescan().await;
        self.reactivate().await;

        while let Some(trigger) = trigger_rx.recv().await {
            self.handle(trigger).await;
        }

        info!("engine stopped");
    }

    /// Process a single trigger
    pub async fn handle(&mut self, trigger: Trigger) {
        debug!(?trigger, "trigger received");

        match trigger {
            Trigger::TopologyChanged => {
                self.rescan().await;
                self.reactivate().await;
            }
            Trigger::PreferenceChanged { key } => self.handle_preference(key).await,
            Trigger::AudioRouteChanged => self.reactivate().await,
            Trigger::Key(key) => {
                // Detached: transactions finish on their own
                self.dispatch_key(key);
            }
            Trigger::SetFeature {
                display,
                feature,
                value,
            } => {
                self.set_feature(&display, feature, value);
            }
        }
    }

    async fn handle_preference(&mut self, key: PrefKey) {
        match key {
            PrefKey::ListenFor | PrefKey::AllScreens => self.reactivate().await,
            PrefKey::ShowContrast => {
                // Contrast tracking is fixed at scan time
                self.rescan().await;
                self.reactivate().await;
            }
            PrefKey::DisplayState(id) => {
                let enabled = self.ctx.prefs.display_enabled(&id);
                match self.roster.find(&id) {
                    Some(display) => {
                        display.set_enabled(enabled);
                        info!(display = %id, enabled, "display toggled");
                    }
                    None => debug!(display = %id, enabled, "toggled display not in roster"),
                }
            }
            PrefKey::LowerContrast | PrefKey::AppAlreadyLaunched => {
                debug!(%key, "preference not used by the engine");
            }
        }
    }

    /// Rebuild the roster from the attached screens
    pub async fn rescan(&mut self) {
        let scanner = self.scanner.clone();
        let roster = match task::spawn_blocking(move || scanner.scan()).await {
            Ok(roster) => roster,
            Err(e) => {
                error!(?e, "topology scan task failed");
                return;
            }
        };

        for display in &roster {
            display.subscribe(self.relay.clone());
        }
        let ids: Vec<DisplayId> = roster.iter().map(|d| d.id().clone()).collect();

        let previous = self.roster.replace(roster);
        info!(
            previous = previous.len(),
            current = self.roster.len(),
            "roster replaced"
        );

        let _ = self.event_tx.send(EngineEvent::RosterChanged { displays: ids });
    }

    /// Recompute the key set and swap the key-tap registration
    pub async fn reactivate(&self) {
        let ctx = self.ctx.clone();
        let roster = self.roster.snapshot();
        let policy = self.policy;

        let keys = match task::spawn_blocking(move || policy.evaluate(&ctx, &roster)).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(?e, "key set evaluation failed, falling back to brightness keys");
                KeySet::BRIGHTNESS_ONLY
            }
        };

        match self.keytap.reactivate(keys) {
            Ok(()) => {
                let _ = self.event_tx.send(EngineEvent::KeySetChanged { keys });
            }
            Err(e) => error!(error = %e, "no key tap registered"),
        }
    }

    /// Spawn one transaction per target display
    ///
    /// Each handle yields whether the hardware accepted the change.
    pub fn dispatch_key(&self, key: MediaKeyEvent) -> Vec<JoinHandle<bool>> {
        if self.roster.is_empty() {
            debug!(%key, "no displays, key ignored");
            return Vec::new();
        }
        let roster = self.roster.snapshot();
        let pointer = self.ctx.screens.pointer_screen();
        dispatch::handle(key, &roster, self.ctx.prefs.scope(), pointer.as_ref())
    }

    /// Apply a slider value to one display
    pub fn set_feature(
        &self,
        id: &DisplayId,
        feature: Feature,
        value: i32,
    ) -> Option<JoinHandle<bool>> {
        let Some(display) = self.roster.find(id) else {
            warn!(display = %id, "slider for unknown display");
            return None;
        };
        if feature == Feature::Contrast && !display.has_contrast_tracking() {
            debug!(display = %id, "contrast not tracked, ignoring slider");
            return None;
        }
        Some(task::spawn_blocking(move || match feature {
            Feature::Brightness => display.set_brightness(value),
            Feature::Volume => display.set_volume(value),
            Feature::Contrast => display.set_contrast(value),
        }))
    }
}
