//! Shared display roster
//!
//! Replaced wholesale on every rescan. Readers take a snapshot of `Arc`s so a
//! replacement never exposes a half-built roster and in-flight transactions
//! keep their display alive until they finish.

use std::sync::{Arc, RwLock};

use crate::display::{Display, DisplayId};

/// Ordered list of controllable displays
pub type Roster = Vec<Arc<Display>>;

#[derive(Clone, Default)]
pub struct SharedRoster {
    inner: Arc<RwLock<Roster>>,
}

impl SharedRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly scanned roster, returning the previous one
    pub fn replace(&self, roster: Roster) -> Roster {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, roster)
    }

    pub fn snapshot(&self) -> Roster {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn find(&self, id: &DisplayId) -> Option<Arc<Display>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|d| d.id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
