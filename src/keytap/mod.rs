//! Key-tap module: media key registrations
//!
//! The controller keeps exactly one registration alive, scoped to the key
//! set derived by the routing policy. Registrations are delivered through the
//! IPC key gate.

mod controller;
mod gate;
mod keys;

pub use controller::{KeyTap, KeyTapController, KeyTapFactory, TapError};
pub use gate::{GateTapFactory, KeyGate};
pub use keys::{KeySet, MediaKeyEvent};
