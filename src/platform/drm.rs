//! Screen enumeration from the kernel DRM connectors in sysfs
//!
//! Each `cardN-<type>-M` directory is one connector. Connected connectors
//! are screens; embedded panel types are reported as built-in.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::display::DisplayId;
use crate::events::Trigger;
use crate::topology::{Screen, ScreenError, ScreenSource};

/// Connector types wired to an internal panel
const BUILTIN_TYPES: [&str; 3] = ["eDP", "LVDS", "DSI"];

/// Connected-connector identity used to detect topology changes
pub type Fingerprint = Vec<(DisplayId, Vec<u8>)>;

/// [`ScreenSource`] over `/sys/class/drm`
pub struct DrmScreens {
    root: PathBuf,
}

impl DrmScreens {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Names of connected connectors, sorted
    fn connected(&self) -> Result<Vec<String>, ScreenError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if connector_type(&name).is_none() {
                continue;
            }
            match std::fs::read_to_string(entry.path().join("status")) {
                Ok(status) if status.trim() == "connected" => names.push(name),
                Ok(_) => {}
                Err(e) => debug!(connector = %name, ?e, "no connector status"),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Connected connectors with their EDID bytes
    pub fn fingerprint(&self) -> Result<Fingerprint, ScreenError> {
        Ok(self
            .connected()?
            .into_iter()
            .map(|name| {
                let edid = std::fs::read(self.root.join(&name).join("edid")).unwrap_or_default();
                (DisplayId::new(name), edid)
            })
            .collect())
    }
}

impl ScreenSource for DrmScreens {
    fn screens(&self) -> Result<Vec<Screen>, ScreenError> {
        Ok(self
            .connected()?
            .into_iter()
            .map(|name| Screen {
                builtin: is_builtin(&name),
                id: DisplayId::new(name),
            })
            .collect())
    }
}

/// `DP` for `card0-DP-1`, `None` for anything that is not a connector
fn connector_type(name: &str) -> Option<&str> {
    let rest = name.strip_prefix("card")?;
    let (card, connector) = rest.split_once('-')?;
    if card.is_empty() || !card.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (kind, _index) = connector.rsplit_once('-')?;
    Some(kind)
}

fn is_builtin(name: &str) -> bool {
    connector_type(name).is_some_and(|kind| BUILTIN_TYPES.contains(&kind))
}

/// Poll the connector set and send `TopologyChanged` when it differs
///
/// Returns when the engine goes away.
pub async fn watch_topology(
    screens: Arc<DrmScreens>,
    period: Duration,
    trigger_tx: mpsc::Sender<Trigger>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last: Option<Fingerprint> = None;
    loop {
        ticker.tick().await;

        let source = Arc::clone(&screens);
        let current = match tokio::task::spawn_blocking(move || source.fingerprint()).await {
            Ok(Ok(current)) => current,
            Ok(Err(e)) => {
                warn!(error = %e, "connector scan failed");
                continue;
            }
            Err(e) => {
                warn!(?e, "connector scan task failed");
                continue;
            }
        };

        let changed = last.as_ref().is_some_and(|last| *last != current);
        if changed {
            info!(connected = current.len(), "display topology changed");
            if trigger_tx.send(Trigger::TopologyChanged).await.is_err() {
                debug!("engine gone, topology watcher exiting");
                return;
            }
        }
        last = Some(current);
    }
}
