//! Preference keys and values

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::display::DisplayId;

/// Suffix of the per-display enabled flag key (`{identifier}-state`)
const DISPLAY_STATE_SUFFIX: &str = "-state";

/// A key in the preference store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrefKey {
    /// Include contrast tracking in scans
    ShowContrast,
    /// Lower contrast after brightness reaches zero (UI layer only)
    LowerContrast,
    /// Apply key presses to every display instead of the current one
    AllScreens,
    /// Preferred media key subset
    ListenFor,
    /// Marks that first-launch defaults were written
    AppAlreadyLaunched,
    /// Per-display enabled flag
    DisplayState(DisplayId),
}

impl PrefKey {
    /// The string key used by the store
    pub fn as_key(&self) -> Cow<'static, str> {
        match self {
            PrefKey::ShowContrast => Cow::Borrowed("showContrast"),
            PrefKey::LowerContrast => Cow::Borrowed("lowerContrast"),
            PrefKey::AllScreens => Cow::Borrowed("allScreens"),
            PrefKey::ListenFor => Cow::Borrowed("listenFor"),
            PrefKey::AppAlreadyLaunched => Cow::Borrowed("appAlreadyLaunched"),
            PrefKey::DisplayState(id) => Cow::Owned(format!("{id}{DISPLAY_STATE_SUFFIX}")),
        }
    }

    /// Parse a store key, `None` for keys the daemon does not know
    pub fn parse(key: &str) -> Option<Self> {
        let known = match key {
            "showContrast" => PrefKey::ShowContrast,
            "lowerContrast" => PrefKey::LowerContrast,
            "allScreens" => PrefKey::AllScreens,
            "listenFor" => PrefKey::ListenFor,
            "appAlreadyLaunched" => PrefKey::AppAlreadyLaunched,
            other => {
                let id = other.strip_suffix(DISPLAY_STATE_SUFFIX)?;
                if id.is_empty() {
                    return None;
                }
                PrefKey::DisplayState(DisplayId::new(id))
            }
        };
        Some(known)
    }
}

impl std::fmt::Display for PrefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// A stored preference value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_roundtrip() {
        for key in [
            PrefKey::ShowContrast,
            PrefKey::LowerContrast,
            PrefKey::AllScreens,
            PrefKey::ListenFor,
            PrefKey::AppAlreadyLaunched,
        ] {
            assert_eq!(PrefKey::parse(&key.as_key()), Some(key));
        }
    }

    #[test]
    fn test_display_state_key() {
        let key = PrefKey::DisplayState(DisplayId::new("card0-DP-2"));
        assert_eq!(key.as_key(), "card0-DP-2-state");
        assert_eq!(PrefKey::parse("card0-DP-2-state"), Some(key));
        assert_eq!(PrefKey::parse("-state"), None);
        assert_eq!(PrefKey::parse("startAtLogin"), None);
    }

    #[test]
    fn test_value_untagged() {
        let v: PrefValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, PrefValue::Bool(true));
        let v: PrefValue = serde_json::from_str("2").unwrap();
        assert_eq!(v, PrefValue::Int(2));
    }
}
