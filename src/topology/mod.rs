//! Topology module: attached screens and the display roster

mod roster;
mod scanner;

pub use roster::{Roster, SharedRoster};
pub use scanner::TopologyScanner;

use crate::display::DisplayId;

/// An attached screen as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub id: DisplayId,
    /// Built-in laptop / all-in-one panel
    pub builtin: bool,
}

/// Errors that can occur while enumerating screens
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("failed to enumerate screens: {0}")]
    Enumerate(#[from] std::io::Error),
}

/// OS list of attached screens
pub trait ScreenSource: Send + Sync {
    /// Attached screens in OS order
    fn screens(&self) -> Result<Vec<Screen>, ScreenError>;

    /// Screen under the pointer, when the platform can tell
    fn pointer_screen(&self) -> Option<DisplayId> {
        None
    }
}
