//! Explicit application context handed to every component

use std::sync::Arc;

use crate::display::LinkFactory;
use crate::prefs::Preferences;
use crate::routing::AudioRoute;
use crate::topology::ScreenSource;

/// Collaborators shared by the scanner, policy, dispatcher and engine
#[derive(Clone)]
pub struct AppContext {
    pub prefs: Preferences,
    pub links: Arc<dyn LinkFactory>,
    pub screens: Arc<dyn ScreenSource>,
    pub audio: Arc<dyn AudioRoute>,
}
