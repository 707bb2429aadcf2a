//! Engine module: the serialized event-delivery context
//!
//! One task owns the roster writes and the key-tap registration:
//! - topology changes and the contrast preference rebuild the roster
//! - preference, audio and topology changes re-register media keys
//! - admitted media keys and slider moves become display transactions

mod runtime;

pub use runtime::Engine;
