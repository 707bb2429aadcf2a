//! Linux implementations of the OS-facing interfaces
//!
//! - `drm`: screens from sysfs DRM connectors, plus a hotplug poller
//! - `ddcutil`: DDC/CI hardware links through the `ddcutil` tool
//! - `pactl`: default audio output and its change events

mod ddcutil;
mod drm;
mod pactl;

pub use ddcutil::DdcutilLinks;
pub use drm::{watch_topology, DrmScreens};
pub use pactl::{watch_audio_route, PactlAudio};
