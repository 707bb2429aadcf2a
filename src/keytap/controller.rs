//! Ownership of the single live key-tap registration
//!
//! Every recomputation stops the current registration before starting a new
//! one scoped to the latest key set. Overlapping callers serialise on the
//! handle lock, so the last caller's key set is the one left running.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::KeySet;

/// Errors that can occur while starting a registration
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    #[error("key tap is already running")]
    AlreadyRunning,
}

/// An OS-level media key registration
pub trait KeyTap: Send {
    /// Keys this registration delivers
    fn keys(&self) -> KeySet;

    /// Begin delivering key events
    fn start(&mut self) -> Result<(), TapError>;

    /// Stop delivering key events; idempotent
    fn stop(&mut self);
}

/// Creates registrations scoped to a key set
pub trait KeyTapFactory: Send + Sync {
    fn create(&self, keys: KeySet) -> Box<dyn KeyTap>;
}

/// Owns at most one live [`KeyTap`]
pub struct KeyTapController {
    factory: Arc<dyn KeyTapFactory>,
    live: Mutex<Option<Box<dyn KeyTap>>>,
}

impl KeyTapController {
    pub fn new(factory: Arc<dyn KeyTapFactory>) -> Self {
        Self {
            factory,
            live: Mutex::new(None),
        }
    }

    fn live(&self) -> MutexGuard<'_, Option<Box<dyn KeyTap>>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the live registration with one scoped to `keys`
    ///
    /// On a start failure no registration is left running.
    pub fn reactivate(&self, keys: KeySet) -> Result<(), TapError> {
        let mut live = self.live();

        if let Some(mut old) = live.take() {
            debug!(keys = ?old.keys(), "stopping key tap");
            old.stop();
        }

        let mut tap = self.factory.create(keys);
        if let Err(e) = tap.start() {
            warn!(?keys, error = %e, "failed to start key tap");
            return Err(e);
        }

        info!(?keys, "key tap started");
        *live = Some(tap);
        Ok(())
    }

    /// Stop the live registration, if any
    pub fn stop(&self) {
        if let Some(mut tap) = self.live().take() {
            tap.stop();
            info!("key tap stopped");
        }
    }
}
