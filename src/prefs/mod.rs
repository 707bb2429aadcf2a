//! Preferences module: persisted user choices
//!
//! Keys follow the layout of the store: `showContrast`, `lowerContrast`,
//! `allScreens`, `listenFor` and one `{identifier}-state` flag per display.

mod keys;
mod preferences;
mod store;

pub use keys::{PrefKey, PrefValue};
pub use preferences::Preferences;
pub use store::{JsonPreferences, PreferenceStore, PrefsError};
