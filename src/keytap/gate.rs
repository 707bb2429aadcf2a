//! Key gate: registrations for media keys delivered over IPC
//!
//! Desktop key bindings forward media keys to the daemon socket. A started
//! [`GateTap`] installs its key set in the shared [`KeyGate`]; the IPC
//! server only forwards keys the installed set admits.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{KeySet, KeyTap, KeyTapFactory, MediaKeyEvent, TapError};

#[derive(Debug, Default)]
struct GateState {
    next_token: u64,
    live: Option<(u64, KeySet)>,
}

/// Admission filter shared between key-tap registrations and the IPC server
#[derive(Debug, Default)]
pub struct KeyGate {
    state: Mutex<GateState>,
}

impl KeyGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the live registration listens for `key`
    pub fn admits(&self, key: MediaKeyEvent) -> bool {
        self.state()
            .live
            .is_some_and(|(_, keys)| keys.contains(key))
    }

    /// Key set of the live registration
    pub fn active(&self) -> Option<KeySet> {
        self.state().live.map(|(_, keys)| keys)
    }

    fn install(&self, keys: KeySet) -> u64 {
        let mut state = self.state();
        state.next_token += 1;
        let token = state.next_token;
        if let Some((old, _)) = state.live.replace((token, keys)) {
            warn!(old, token, "replacing a registration that was never stopped");
        }
        debug!(token, ?keys, "gate registration installed");
        token
    }

    fn remove(&self, token: u64) {
        let mut state = self.state();
        if state.live.is_some_and(|(live, _)| live == token) {
            state.live = None;
            debug!(token, "gate registration removed");
        }
    }
}

/// Factory for [`GateTap`] registrations on one gate
#[derive(Clone)]
pub struct GateTapFactory {
    gate: Arc<KeyGate>,
}

impl GateTapFactory {
    pub fn new(gate: Arc<KeyGate>) -> Self {
        Self { gate }
    }
}

impl KeyTapFactory for GateTapFactory {
    fn create(&self, keys: KeySet) -> Box<dyn KeyTap> {
        Box::new(GateTap {
            gate: Arc::clone(&self.gate),
            keys,
            token: None,
        })
    }
}

/// A registration that is live while installed in its gate
pub struct GateTap {
    gate: Arc<KeyGate>,
    keys: KeySet,
    token: Option<u64>,
}

impl KeyTap for GateTap {
    fn keys(&self) -> KeySet {
        self.keys
    }

    fn start(&mut self) -> Result<(), TapError> {
        if self.token.is_some() {
            return Err(TapError::AlreadyRunning);
        }
        self.token = Some(self.gate.install(self.keys));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            self.gate.remove(token);
        }
    }
}

impl Drop for GateTap {
    fn drop(&mut self) {
        self.stop();
    }
}
