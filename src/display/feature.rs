//! Controllable monitor features and their DDC/CI VCP codes

use serde::{Deserialize, Serialize};

/// A monitor property addressed by a VCP command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Backlight luminance (VCP 0x10)
    Brightness,
    /// Built-in speaker volume (VCP 0x62)
    #[serde(rename = "audio_speaker_volume", alias = "volume")]
    Volume,
    /// Contrast (VCP 0x12)
    Contrast,
}

impl Feature {
    /// Every feature the daemon tracks, in cache order
    pub const ALL: [Feature; 3] = [Feature::Brightness, Feature::Volume, Feature::Contrast];

    /// The VCP code used on the wire
    pub fn vcp_code(self) -> u8 {
        match self {
            Feature::Brightness => 0x10,
            Feature::Volume => 0x62,
            Feature::Contrast => 0x12,
        }
    }

    /// Slot of this feature in per-display caches
    pub(crate) fn index(self) -> usize {
        match self {
            Feature::Brightness => 0,
            Feature::Volume => 1,
            Feature::Contrast => 2,
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::Brightness => write!(f, "brightness"),
            Feature::Volume => write!(f, "audioSpeakerVolume"),
            Feature::Contrast => write!(f, "contrast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcp_codes() {
        assert_eq!(Feature::Brightness.vcp_code(), 0x10);
        assert_eq!(Feature::Volume.vcp_code(), 0x62);
        assert_eq!(Feature::Contrast.vcp_code(), 0x12);
    }

    #[test]
    fn test_feature_wire_names() {
        let json = serde_json::to_string(&Feature::Volume).unwrap();
        assert_eq!(json, "\"audio_speaker_volume\"");

        let parsed: Feature = serde_json::from_str("\"volume\"").unwrap();
        assert_eq!(parsed, Feature::Volume);
    }

    #[test]
    fn test_cache_slots_are_distinct() {
        let mut slots: Vec<usize> = Feature::ALL.iter().map(|f| f.index()).collect();
        slots.dedup();
        assert_eq!(slots, vec![0, 1, 2]);
    }
}
