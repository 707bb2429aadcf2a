//! Typed access to the preferences the daemon reads and writes

use std::sync::Arc;

use tracing::info;

use super::{PrefKey, PrefValue, PreferenceStore, PrefsError};
use crate::display::DisplayId;
use crate::routing::{ListenFor, RoutingScope};

/// Typed view over a shared [`PreferenceStore`]
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    fn flag(&self, key: PrefKey) -> bool {
        self.store.bool(&key.as_key()).unwrap_or(false)
    }

    pub fn show_contrast(&self) -> bool {
        self.flag(PrefKey::ShowContrast)
    }

    pub fn lower_contrast(&self) -> bool {
        self.flag(PrefKey::LowerContrast)
    }

    pub fn all_screens(&self) -> bool {
        self.flag(PrefKey::AllScreens)
    }

    pub fn scope(&self) -> RoutingScope {
        RoutingScope::from_all_screens(self.all_screens())
    }

    pub fn listen_for(&self) -> ListenFor {
        ListenFor::from_pref(self.store.int(&PrefKey::ListenFor.as_key()))
    }

    /// Per-display enabled flag, `true` when never set
    pub fn display_enabled(&self, id: &DisplayId) -> bool {
        self.store
            .bool(&PrefKey::DisplayState(id.clone()).as_key())
            .unwrap_or(true)
    }

    pub fn set_display_enabled(&self, id: &DisplayId, enabled: bool) -> Result<(), PrefsError> {
        self.set(&PrefKey::DisplayState(id.clone()), PrefValue::Bool(enabled))
    }

    /// Write a raw value under `key`
    pub fn set(&self, key: &PrefKey, value: PrefValue) -> Result<(), PrefsError> {
        match value {
            PrefValue::Bool(v) => self.store.set_bool(&key.as_key(), v),
            PrefValue::Int(v) => self.store.set_int(&key.as_key(), v),
        }
    }

    /// Seed defaults the first time the daemon runs against a store
    pub fn apply_first_launch_defaults(&self) -> Result<(), PrefsError> {
        if self.flag(PrefKey::AppAlreadyLaunched) {
            return Ok(());
        }
        self.set(&PrefKey::AppAlreadyLaunched, PrefValue::Bool(true))?;
        self.set(&PrefKey::ShowContrast, PrefValue::Bool(false))?;
        self.set(&PrefKey::LowerContrast, PrefValue::Bool(false))?;
        info!("first launch, default preferences written");
        Ok(())
    }
}
