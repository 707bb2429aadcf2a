//! Routing module: key set gating and target scope

mod audio;
mod policy;

pub use audio::{AudioOutput, AudioRoute};
pub use policy::{AudioMatch, ListenFor, RoutingPolicy, RoutingScope};
