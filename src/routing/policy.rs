//! Routing policy: which keys are listened for and where they go
//!
//! Volume keys are only registered while the monitors in the roster are the
//! active audio output. The comparison is by display name against the name
//! of the default audio device.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::AppContext;
use crate::display::Display;
use crate::keytap::KeySet;

/// Preferred key subset, stored as `listenFor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenFor {
    /// Brightness and volume keys (`0`)
    Full,
    /// Brightness keys only (`1`)
    BrightnessOnly,
    /// Mute and volume keys only (`2`)
    VolumeOnly,
}

impl ListenFor {
    /// Map the stored integer; unknown or missing values mean `Full`
    pub fn from_pref(value: Option<i64>) -> Self {
        match value {
            Some(1) => ListenFor::BrightnessOnly,
            Some(2) => ListenFor::VolumeOnly,
            _ => ListenFor::Full,
        }
    }

    pub fn keys(self) -> KeySet {
        match self {
            ListenFor::Full => KeySet::FULL,
            ListenFor::BrightnessOnly => KeySet::BRIGHTNESS_ONLY,
            ListenFor::VolumeOnly => KeySet::VOLUME_ONLY,
        }
    }
}

/// Whether a key press targets the current display or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingScope {
    CurrentOnly,
    All,
}

impl RoutingScope {
    pub fn from_all_screens(all_screens: bool) -> Self {
        if all_screens {
            RoutingScope::All
        } else {
            RoutingScope::CurrentOnly
        }
    }
}

/// How display names are correlated with the audio output name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMatch {
    /// Every display in the roster must carry the audio output's name
    #[default]
    All,
    /// At least one display must carry the audio output's name
    Any,
}

impl FromStr for AudioMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(AudioMatch::All),
            "any" => Ok(AudioMatch::Any),
            other => Err(format!("unknown audio match policy '{other}' (expected all|any)")),
        }
    }
}

/// Derives the active key set from preferences and audio correlation
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingPolicy {
    audio_match: AudioMatch,
}

impl RoutingPolicy {
    pub fn new(audio_match: AudioMatch) -> Self {
        Self { audio_match }
    }

    pub fn audio_match(&self) -> AudioMatch {
        self.audio_match
    }

    /// Whether volume and mute keys may be registered
    ///
    /// Fails closed when the audio output name is unknown or the roster is
    /// empty.
    pub fn volume_allowed<'a, I>(&self, display_names: I, audio_name: Option<&str>) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(audio_name) = audio_name else {
            return false;
        };
        let mut names = display_names.into_iter().peekable();
        if names.peek().is_none() {
            return false;
        }
        match self.audio_match {
            AudioMatch::All => names.all(|name| name == audio_name),
            AudioMatch::Any => names.any(|name| name == audio_name),
        }
    }

    /// The key set to register for the given inputs
    pub fn active_keys<'a, I>(
        &self,
        display_names: I,
        audio_name: Option<&str>,
        listen_for: ListenFor,
    ) -> KeySet
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.volume_allowed(display_names, audio_name) {
            debug!(?listen_for, "volume control for displays is on");
            listen_for.keys()
        } else {
            debug!("volume control for displays is off");
            KeySet::BRIGHTNESS_ONLY
        }
    }

    /// Recompute the key set from live preferences and audio route
    ///
    /// Blocking: queries the audio route.
    pub fn evaluate(&self, ctx: &AppContext, roster: &[Arc<Display>]) -> KeySet {
        let audio_name = ctx.audio.current_output_name();
        self.active_keys(
            roster.iter().map(|d| d.name()),
            audio_name.as_deref(),
            ctx.prefs.listen_for(),
        )
    }
}
