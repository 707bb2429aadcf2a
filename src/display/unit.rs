//! A single controllable monitor and its cached feature values

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Feature, HardwareLink};

/// Relative change applied by one media key press (100 / 16, integer division)
pub const STEP: i32 = 100 / 16;

/// Upper bound of every feature value
pub const MAX_VALUE: u8 = 100;

/// Apply a relative delta to a value, clamped to `0..=100`
pub fn step_value(current: u8, delta: i32) -> u8 {
    clamp_value(i32::from(current) + delta)
}

/// Clamp an arbitrary integer into the feature range
pub fn clamp_value(value: i32) -> u8 {
    // The clamp bounds fit in a u8.
    value.clamp(0, i32::from(MAX_VALUE)) as u8
}

/// Stable hardware identifier of a display within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayId(String);

impl DisplayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives feature updates after successful hardware writes
pub trait DisplayObserver: Send + Sync {
    fn feature_changed(&self, display: &DisplayId, feature: Feature, value: u8);
}

/// Lazily populated feature values, indexed by [`Feature::index`]
#[derive(Debug, Default, Clone, Copy)]
struct FeatureCache([Option<u8>; Feature::ALL.len()]);

impl FeatureCache {
    fn get(&self, feature: Feature) -> Option<u8> {
        self.0[feature.index()]
    }

    fn put(&mut self, feature: Feature, value: u8) {
        self.0[feature.index()] = Some(value);
    }
}

/// One attached, DDC-capable monitor
///
/// Instances live only as long as the roster they were scanned into.
/// Hardware transactions on one display are serialised by `io`, held for the
/// whole read-modify-write. The cache lock is only taken to copy values in or
/// out, so readers never wait on the link.
pub struct Display {
    id: DisplayId,
    name: String,
    enabled: AtomicBool,
    contrast_tracking: bool,
    link: Arc<dyn HardwareLink>,
    io: Mutex<()>,
    cache: Mutex<FeatureCache>,
    observers: Mutex<Vec<Arc<dyn DisplayObserver>>>,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("contrast_tracking", &self.contrast_tracking)
            .finish()
    }
}

impl Display {
    pub fn new(
        id: DisplayId,
        name: impl Into<String>,
        link: Arc<dyn HardwareLink>,
        enabled: bool,
        contrast_tracking: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: AtomicBool::new(enabled),
            contrast_tracking,
            link,
            io: Mutex::new(()),
            cache: Mutex::new(FeatureCache::default()),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &DisplayId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether contrast was being tracked when this display was scanned
    pub fn has_contrast_tracking(&self) -> bool {
        self.contrast_tracking
    }

    /// Register an observer for successful writes
    pub fn subscribe(&self, observer: Arc<dyn DisplayObserver>) {
        lock(&self.observers).push(observer);
    }

    /// Cached value without touching the hardware
    pub fn cached(&self, feature: Feature) -> Option<u8> {
        lock(&self.cache).get(feature)
    }

    pub fn set_brightness(&self, value: i32) -> bool {
        self.set(Feature::Brightness, value)
    }

    pub fn set_volume(&self, value: i32) -> bool {
        self.set(Feature::Volume, value)
    }

    pub fn set_contrast(&self, value: i32) -> bool {
        self.set(Feature::Contrast, value)
    }

    /// Drop the volume to zero; a later volume-up steps from there
    pub fn mute(&self) -> bool {
        self.set_volume(0)
    }

    /// Write a clamped value. Returns whether the hardware accepted it.
    fn set(&self, feature: Feature, value: i32) -> bool {
        let value = clamp_value(value);
        let written = {
            let _io = lock(&self.io);
            self.write(feature, value)
        };
        if written {
            self.notify(feature, value);
        }
        written
    }

    /// Step a feature by `delta` from this display's own cached value
    ///
    /// The new value is `step_value(cached, delta)`, read and written within
    /// one transaction. Returns it, or `None` when the read or write failed.
    pub fn adjust(&self, feature: Feature, delta: i32) -> Option<u8> {
        let value = {
            let _io = lock(&self.io);
            let value = step_value(self.load(feature)?, delta);
            self.write(feature, value).then_some(value)?
        };
        self.notify(feature, value);
        Some(value)
    }

    fn load(&self, feature: Feature) -> Option<u8> {
        if let Some(value) = self.cached(feature) {
            return Some(value);
        }
        match self.link.get(feature) {
            Ok(value) => {
                let value = value.min(MAX_VALUE);
                lock(&self.cache).put(feature, value);
                Some(value)
            }
            Err(e) => {
                debug!(display = %self.id, %feature, error = %e, "feature read failed");
                None
            }
        }
    }

    fn write(&self, feature: Feature, value: u8) -> bool {
        match self.link.set(feature, value) {
            Ok(()) => {
                lock(&self.cache).put(feature, value);
                debug!(display = %self.id, %feature, value, "feature written");
                true
            }
            Err(e) => {
                debug!(display = %self.id, %feature, value, error = %e, "feature write failed");
                false
            }
        }
    }

    fn notify(&self, feature: Feature, value: u8) {
        let observers = lock(&self.observers).clone();
        for observer in observers {
            observer.feature_changed(&self.id, feature, value);
        }
    }
}

/// Lock ignoring poisoning; the guarded data stays consistent per write
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeLink, HeldLink, RecordingObserver};
    use proptest::prelude::*;
    use std::thread;
    use std::time::Duration;

    fn display_with(link: &Arc<FakeLink>) -> Display {
        Display::new(DisplayId::new("card0-DP-1"), "Test", link.clone(), true, false)
    }

    #[test]
    fn test_step_is_six() {
        assert_eq!(STEP, 6);
    }

    proptest! {
        #[test]
        fn step_value_stays_in_range(current in 0u8..=100, delta in -100i32..=100) {
            let value = step_value(current, delta);
            prop_assert!(value <= 100);
        }
    }

    #[test]
    fn test_step_value_clamps() {
        assert_eq!(step_value(98, STEP), 100);
        assert_eq!(step_value(3, -STEP), 0);
        assert_eq!(step_value(50, -STEP), 44);
    }

    #[test]
    fn test_adjust_clamps_at_bounds() {
        let link = FakeLink::with_values(98, 3, 50);
        let display = display_with(&link);
        assert_eq!(display.adjust(Feature::Brightness, STEP), Some(100));
        assert_eq!(display.adjust(Feature::Volume, -STEP), Some(0));
        assert_eq!(link.value(Feature::Brightness), 100);
    }

    #[test]
    fn test_cache_populated_lazily() {
        let link = FakeLink::with_values(40, 20, 50);
        let display = display_with(&link);
        assert_eq!(display.cached(Feature::Brightness), None);
        assert_eq!(display.adjust(Feature::Brightness, STEP), Some(46));
        assert_eq!(display.adjust(Feature::Brightness, STEP), Some(52));
        assert_eq!(link.reads(), 1);
        assert_eq!(link.writes(), 2);
    }

    #[test]
    fn test_set_clamps_and_caches() {
        let link = FakeLink::with_values(40, 20, 50);
        let display = display_with(&link);
        assert!(display.set_brightness(140));
        assert_eq!(display.cached(Feature::Brightness), Some(100));
        assert_eq!(link.value(Feature::Brightness), 100);
        assert!(display.set_contrast(-5));
        assert_eq!(display.cached(Feature::Contrast), Some(0));
    }

    #[test]
    fn test_failed_set_leaves_state() {
        let link = FakeLink::with_values(40, 20, 50);
        let display = display_with(&link);
        assert_eq!(display.adjust(Feature::Volume, 0), Some(20));
        link.fail_sets(true);
        assert!(!display.set_volume(60));
        assert_eq!(display.cached(Feature::Volume), Some(20));
    }

    #[test]
    fn test_failed_get_is_not_cached() {
        let link = FakeLink::with_values(40, 20, 50);
        link.fail_gets(true);
        let display = display_with(&link);
        assert_eq!(display.adjust(Feature::Brightness, STEP), None);
        assert_eq!(display.cached(Feature::Brightness), None);
        assert_eq!(link.writes(), 0);
    }

    #[test]
    fn test_mute_then_volume_up_steps_from_zero() {
        let link = FakeLink::with_values(40, 33, 50);
        let display = display_with(&link);
        assert!(display.mute());
        assert_eq!(display.adjust(Feature::Volume, STEP), Some(6));
    }

    #[test]
    fn test_observers_see_successful_writes_only() {
        let link = FakeLink::with_values(40, 20, 50);
        let display = display_with(&link);
        let observer = RecordingObserver::new();
        display.subscribe(observer.clone());

        display.adjust(Feature::Brightness, STEP);
        link.fail_sets(true);
        display.set_brightness(10);

        let seen = observer.events();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (DisplayId::new("card0-DP-1"), Feature::Brightness, 46));
    }

    #[test]
    fn test_cached_read_does_not_wait_for_transaction() {
        let link = FakeLink::with_values(40, 20, 50);
        let (held, hold) = HeldLink::new(link.clone());
        let display = Arc::new(Display::new(
            DisplayId::new("card0-DP-1"),
            "Test",
            held,
            true,
            false,
        ));

        let writer = {
            let display = Arc::clone(&display);
            thread::spawn(move || display.set_brightness(60))
        };
        hold.entered.recv_timeout(Duration::from_secs(5)).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let reader = Arc::clone(&display);
        thread::spawn(move || tx.send(reader.cached(Feature::Brightness)).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)), Ok(None));

        hold.release.send(()).unwrap();
        assert!(writer.join().unwrap());
        assert_eq!(display.cached(Feature::Brightness), Some(60));
        assert_eq!(link.value(Feature::Brightness), 60);
    }

    #[test]
    fn test_enabled_toggle() {
        let link = FakeLink::with_values(0, 0, 0);
        let display = display_with(&link);
        assert!(display.is_enabled());
        display.set_enabled(false);
        assert!(!display.is_enabled());
    }
}
