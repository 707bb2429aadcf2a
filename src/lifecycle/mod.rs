//! Process lifecycle: signals

mod shutdown;

pub use shutdown::{forward_hangups, ShutdownSignal};
