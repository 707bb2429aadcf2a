//! Events module for engine inputs and outputs
//!
//! `Trigger`s flow into the engine from the OS-side watchers and the IPC
//! server; `EngineEvent`s flow out to subscribed IPC clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::display::{DisplayId, DisplayObserver, Feature};
use crate::keytap::{KeySet, MediaKeyEvent};
use crate::prefs::PrefKey;

/// Inputs to the engine, delivered one at a time
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// Screens were attached, removed or reconfigured
    TopologyChanged,
    /// A preference was written
    PreferenceChanged { key: PrefKey },
    /// The default audio output changed; refetch it
    AudioRouteChanged,
    /// A media key admitted by the live key-tap registration
    Key(MediaKeyEvent),
    /// A slider moved in a UI client
    SetFeature {
        display: DisplayId,
        feature: Feature,
        value: i32,
    },
}

/// Events emitted by the engine for UI clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The roster was rebuilt
    RosterChanged {
        /// Identifiers of the displays in the new roster
        displays: Vec<DisplayId>,
    },

    /// A feature value was written to a display
    FeatureChanged {
        display: DisplayId,
        feature: Feature,
        value: u8,
    },

    /// A new key-tap registration is live
    KeySetChanged { keys: KeySet },
}

impl std::fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineEvent::RosterChanged { displays } => {
                write!(f, "ROSTER_CHANGED ({} displays)", displays.len())
            }
            EngineEvent::FeatureChanged {
                display,
                feature,
                value,
            } => write!(f, "FEATURE_CHANGED ({display} {feature}={value})"),
            EngineEvent::KeySetChanged { keys } => write!(f, "KEY_SET_CHANGED ({keys:?})"),
        }
    }
}

/// Forwards display updates onto the engine event channel
pub struct EventRelay {
    event_tx: broadcast::Sender<EngineEvent>,
}

impl EventRelay {
    pub fn new(event_tx: broadcast::Sender<EngineEvent>) -> Self {
        Self { event_tx }
    }
}

impl DisplayObserver for EventRelay {
    fn feature_changed(&self, display: &DisplayId, feature: Feature, value: u8) {
        // No subscribers is fine
        let _ = self.event_tx.send(EngineEvent::FeatureChanged {
            display: display.clone(),
            feature,
            value,
        });
    }
}
