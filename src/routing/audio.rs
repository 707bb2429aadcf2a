//! Current system audio output

use serde::{Deserialize, Serialize};

/// The default playback device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOutput {
    pub id: String,
    pub name: String,
}

/// Source of the current default audio output
///
/// Change notifications arrive separately as `Trigger::AudioRouteChanged`;
/// consumers refetch through this trait.
pub trait AudioRoute: Send + Sync {
    fn current_output(&self) -> Option<AudioOutput>;

    fn current_output_name(&self) -> Option<String> {
        self.current_output().map(|output| output.name)
    }
}
