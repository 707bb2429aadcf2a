//! Display module: one controllable monitor and its command channel
//!
//! A `Display` caches brightness, volume and contrast in `0..=100`, filled
//! lazily from the hardware link and updated only by successful writes.
//! Hardware failures are swallowed; DDC transactions are unreliable and the
//! daemon treats every write as best effort.

pub mod edid;
mod feature;
mod link;
mod unit;

pub use feature::Feature;
pub use link::{HardwareLink, LinkError, LinkFactory};
pub use unit::{Display, DisplayId, DisplayObserver, MAX_VALUE, STEP};
