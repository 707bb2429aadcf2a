//! Media key definitions and key sets
//!
//! Provides the media key event variants and a compact set type used to
//! scope a key-tap registration.

use serde::{Deserialize, Serialize};

/// A media key event delivered by a key-tap registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKeyEvent {
    BrightnessUp,
    BrightnessDown,
    VolumeUp,
    VolumeDown,
    Mute,
    /// Any other key; dropped by the dispatcher
    #[serde(other)]
    Ignored,
}

impl MediaKeyEvent {
    /// Bit of this key in a [`KeySet`], `None` for `Ignored`
    fn bit(self) -> Option<u8> {
        match self {
            MediaKeyEvent::BrightnessUp => Some(flags::BRIGHTNESS_UP),
            MediaKeyEvent::BrightnessDown => Some(flags::BRIGHTNESS_DOWN),
            MediaKeyEvent::VolumeUp => Some(flags::VOLUME_UP),
            MediaKeyEvent::VolumeDown => Some(flags::VOLUME_DOWN),
            MediaKeyEvent::Mute => Some(flags::MUTE),
            MediaKeyEvent::Ignored => None,
        }
    }
}

impl std::fmt::Display for MediaKeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKeyEvent::BrightnessUp => write!(f, "BRIGHTNESS_UP"),
            MediaKeyEvent::BrightnessDown => write!(f, "BRIGHTNESS_DOWN"),
            MediaKeyEvent::VolumeUp => write!(f, "VOLUME_UP"),
            MediaKeyEvent::VolumeDown => write!(f, "VOLUME_DOWN"),
            MediaKeyEvent::Mute => write!(f, "MUTE"),
            MediaKeyEvent::Ignored => write!(f, "IGNORED"),
        }
    }
}

/// Key bit masks
mod flags {
    pub const BRIGHTNESS_UP: u8 = 1 << 0;
    pub const BRIGHTNESS_DOWN: u8 = 1 << 1;
    pub const VOLUME_UP: u8 = 1 << 2;
    pub const VOLUME_DOWN: u8 = 1 << 3;
    pub const MUTE: u8 = 1 << 4;
}

/// Set of media keys a registration listens for
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeySet(u8);

impl KeySet {
    /// Brightness up / down
    pub const BRIGHTNESS_ONLY: KeySet = KeySet(flags::BRIGHTNESS_UP | flags::BRIGHTNESS_DOWN);
    /// Mute, volume up / down
    pub const VOLUME_ONLY: KeySet = KeySet(flags::VOLUME_UP | flags::VOLUME_DOWN | flags::MUTE);
    /// Every media key
    pub const FULL: KeySet = KeySet(Self::BRIGHTNESS_ONLY.0 | Self::VOLUME_ONLY.0);

    pub const ORDER: [MediaKeyEvent; 5] = [
        MediaKeyEvent::BrightnessUp,
        MediaKeyEvent::BrightnessDown,
        MediaKeyEvent::Mute,
        MediaKeyEvent::VolumeUp,
        MediaKeyEvent::VolumeDown,
    ];

    pub fn contains(self, key: MediaKeyEvent) -> bool {
        key.bit().is_some_and(|bit| self.0 & bit != 0)
    }

    /// The keys in this set, in a fixed order
    pub fn keys(self) -> Vec<MediaKeyEvent> {
        Self::ORDER
            .into_iter()
            .filter(|key| self.contains(*key))
            .collect()
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

impl FromIterator<MediaKeyEvent> for KeySet {
    fn from_iter<I: IntoIterator<Item = MediaKeyEvent>>(iter: I) -> Self {
        KeySet(iter.into_iter().filter_map(MediaKeyEvent::bit).fold(0, |acc, bit| acc | bit))
    }
}

impl Serialize for KeySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.keys())
    }
}

impl<'de> Deserialize<'de> for KeySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<MediaKeyEvent>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}
