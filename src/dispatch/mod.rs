//! Media key dispatch: turns one key event into per-display commands
//!
//! Resolution happens in two steps. `plan` picks the action and the enabled
//! target displays without touching hardware; `Action::apply` then runs the
//! blocking transaction for one target. Every target steps from its own
//! cached value.

use std::sync::Arc;

use tokio::task::{self, JoinHandle};
use tracing::debug;

use crate::display::{Display, DisplayId, Feature, STEP};
use crate::keytap::MediaKeyEvent;
use crate::routing::RoutingScope;

/// Hardware change requested by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Step a feature by a signed delta
    Adjust(Feature, i32),
    /// Set volume to zero
    Mute,
}

impl Action {
    /// Action for a key, `None` when the key is dropped
    pub fn for_key(key: MediaKeyEvent) -> Option<Self> {
        match key {
            MediaKeyEvent::BrightnessUp => Some(Action::Adjust(Feature::Brightness, STEP)),
            MediaKeyEvent::BrightnessDown => Some(Action::Adjust(Feature::Brightness, -STEP)),
            MediaKeyEvent::VolumeUp => Some(Action::Adjust(Feature::Volume, STEP)),
            MediaKeyEvent::VolumeDown => Some(Action::Adjust(Feature::Volume, -STEP)),
            MediaKeyEvent::Mute => Some(Action::Mute),
            MediaKeyEvent::Ignored => None,
        }
    }

    /// Run against one display. Returns whether the hardware accepted it.
    ///
    /// Blocking.
    pub fn apply(self, display: &Display) -> bool {
        match self {
            Action::Adjust(feature, delta) => display.adjust(feature, delta).is_some(),
            Action::Mute => display.mute(),
        }
    }
}

/// A resolved key press: what to do and on which displays
#[derive(Debug)]
pub struct Dispatch {
    pub action: Action,
    pub targets: Vec<Arc<Display>>,
}

/// Display under the pointer, falling back to the first in the roster
pub fn current_display<'a>(
    roster: &'a [Arc<Display>],
    pointer: Option<&DisplayId>,
) -> Option<&'a Arc<Display>> {
    pointer
        .and_then(|id| roster.iter().find(|d| d.id() == id))
        .or_else(|| roster.first())
}

/// Resolve a key press against a roster without touching hardware
///
/// Returns `None` for dropped keys and when no current display exists.
pub fn plan(
    key: MediaKeyEvent,
    roster: &[Arc<Display>],
    scope: RoutingScope,
    pointer: Option<&DisplayId>,
) -> Option<Dispatch> {
    let Some(action) = Action::for_key(key) else {
        debug!(%key, "key ignored");
        return None;
    };
    let Some(current) = current_display(roster, pointer) else {
        debug!(%key, "no display to control");
        return None;
    };

    let candidates = match scope {
        RoutingScope::All => roster.to_vec(),
        RoutingScope::CurrentOnly => vec![Arc::clone(current)],
    };
    let targets: Vec<_> = candidates
        .into_iter()
        .filter(|d| {
            let enabled = d.is_enabled();
            if !enabled {
                debug!(display = %d.id(), "display disabled, skipping");
            }
            enabled
        })
        .collect();

    Some(Dispatch { action, targets })
}

/// Resolve a key press and start one blocking transaction per target
///
/// Each handle yields whether the hardware accepted the change. Must be
/// called from within the runtime.
pub fn handle(
    key: MediaKeyEvent,
    roster: &[Arc<Display>],
    scope: RoutingScope,
    pointer: Option<&DisplayId>,
) -> Vec<JoinHandle<bool>> {
    let Some(dispatch) = plan(key, roster, scope, pointer) else {
        return Vec::new();
    };
    debug!(%key, ?scope, targets = dispatch.targets.len(), "dispatching key");

    let action = dispatch.action;
    dispatch
        .targets
        .into_iter()
        .map(|display| task::spawn_blocking(move || action.apply(&display)))
        .collect()
}
