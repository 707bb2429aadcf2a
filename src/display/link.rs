//! Per-display DDC/CI command channel
//!
//! The transport behind a link is opaque to the rest of the daemon. Every
//! call may block for an unspecified time, so callers run them off the
//! engine task.

use std::sync::Arc;

use super::Feature;
use crate::topology::Screen;

/// Errors raised by a hardware link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("no I2C bus found for display {0}")]
    NoBus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}: {stderr}")]
    Tool {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected reply: {0}")]
    Parse(String),
}

/// Opaque command channel to one monitor
pub trait HardwareLink: Send + Sync {
    /// Read the EDID block, `None` when the display does not answer
    fn probe(&self) -> Result<Option<Vec<u8>>, LinkError>;

    /// Read a feature value normalised to 0..=100
    fn get(&self, feature: Feature) -> Result<u8, LinkError>;

    /// Write a feature value given in 0..=100
    fn set(&self, feature: Feature, value: u8) -> Result<(), LinkError>;
}

/// Opens hardware links for attached screens
pub trait LinkFactory: Send + Sync {
    /// Open the link for `screen`, failing when no channel can be resolved
    fn open(&self, screen: &Screen) -> Result<Arc<dyn HardwareLink>, LinkError>;
}
