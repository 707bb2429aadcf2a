//! Topology scanner: builds the roster from attached screens
//!
//! Built-in panels are skipped. Every other screen is probed for an EDID
//! through its hardware link; screens that do not answer are left out
//! without an error.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::{Roster, Screen};
use crate::context::AppContext;
use crate::display::{edid, Display};

/// Builds display rosters from the context's screen source and link factory
#[derive(Clone)]
pub struct TopologyScanner {
    ctx: AppContext,
}

impl TopologyScanner {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Enumerate and probe attached screens
    ///
    /// Blocking: probes every external screen over its link.
    pub fn scan(&self) -> Roster {
        let screens = match self.ctx.screens.screens() {
            Ok(screens) => screens,
            Err(e) => {
                warn!(error = %e, "screen enumeration failed");
                return Roster::new();
            }
        };

        let contrast_tracking = self.ctx.prefs.show_contrast();
        let mut seen = HashSet::new();
        let mut roster = Roster::new();

        for screen in screens {
            if screen.builtin {
                debug!(screen = %screen.id, "skipping built-in panel");
                continue;
            }
            if !seen.insert(screen.id.clone()) {
                warn!(screen = %screen.id, "duplicate screen id, skipping");
                continue;
            }
            if let Some(display) = self.probe(&screen, contrast_tracking) {
                roster.push(display.into());
            }
        }

        if roster.is_empty() {
            info!("no supported display found");
        } else {
            info!(
                displays = roster.len(),
                names = ?roster.iter().map(|d| d.name()).collect::<Vec<_>>(),
                "roster scanned"
            );
        }
        roster
    }

    fn probe(&self, screen: &Screen, contrast_tracking: bool) -> Option<Display> {
        let link = match self.ctx.links.open(screen) {
            Ok(link) => link,
            Err(e) => {
                debug!(screen = %screen.id, error = %e, "no hardware link");
                return None;
            }
        };

        let edid = match link.probe() {
            Ok(Some(edid)) if !edid.is_empty() => edid,
            Ok(_) => {
                debug!(screen = %screen.id, "no EDID, not DDC capable");
                return None;
            }
            Err(e) => {
                debug!(screen = %screen.id, error = %e, "EDID probe failed");
                return None;
            }
        };

        let name = edid::display_name(&edid);
        let enabled = self.ctx.prefs.display_enabled(&screen.id);
        debug!(screen = %screen.id, %name, enabled, "display found");

        Some(Display::new(
            screen.id.clone(),
            name,
            link,
            enabled,
            contrast_tracking,
        ))
    }
}
