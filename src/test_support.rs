//! In-memory fakes of the external interfaces, for unit tests

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use crate::context::AppContext;
use crate::display::edid::tests::edid_with_name;
use crate::display::{Display, DisplayId, DisplayObserver, Feature, HardwareLink, LinkError, LinkFactory};
use crate::keytap::{KeySet, KeyTap, KeyTapFactory, TapError};
use crate::prefs::{JsonPreferences, Preferences};
use crate::routing::{AudioOutput, AudioRoute};
use crate::topology::{Screen, ScreenError, ScreenSource};

/// Scriptable hardware link with transaction counters
pub struct FakeLink {
    values: Mutex<[u8; 3]>,
    edid: Option<Vec<u8>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_probe: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FakeLink {
    fn build(edid: Option<Vec<u8>>, values: [u8; 3]) -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(values),
            edid,
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_probe: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    pub fn with_values(brightness: u8, volume: u8, contrast: u8) -> Arc<Self> {
        Self::build(Some(edid_with_name(Some("Test"))), [brightness, volume, contrast])
    }

    pub fn named(name: &str) -> Arc<Self> {
        Self::build(Some(edid_with_name(Some(name))), [50, 50, 50])
    }

    /// A screen that never answers the EDID probe
    pub fn silent() -> Arc<Self> {
        Self::build(None, [50, 50, 50])
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn value(&self, feature: Feature) -> u8 {
        self.values.lock().unwrap()[feature.index()]
    }
}

impl HardwareLink for FakeLink {
    fn probe(&self) -> Result<Option<Vec<u8>>, LinkError> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(LinkError::Io(io::Error::new(io::ErrorKind::TimedOut, "probe timed out")));
        }
        Ok(self.edid.clone())
    }

    fn get(&self, feature: Feature) -> Result<u8, LinkError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(LinkError::Io(io::Error::new(io::ErrorKind::TimedOut, "no reply")));
        }
        Ok(self.value(feature))
    }

    fn set(&self, feature: Feature, value: u8) -> Result<(), LinkError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(LinkError::Parse("nak".into()));
        }
        self.values.lock().unwrap()[feature.index()] = value;
        Ok(())
    }
}

/// Link whose writes park until the test releases them
pub struct HeldLink {
    inner: Arc<FakeLink>,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

/// Test side of a [`HeldLink`]
pub struct LinkHold {
    pub entered: mpsc::Receiver<()>,
    pub release: mpsc::Sender<()>,
}

impl HeldLink {
    pub fn new(inner: Arc<FakeLink>) -> (Arc<Self>, LinkHold) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let link = Arc::new(Self {
            inner,
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        let hold = LinkHold {
            entered: entered_rx,
            release: release_tx,
        };
        (link, hold)
    }
}

impl HardwareLink for HeldLink {
    fn probe(&self) -> Result<Option<Vec<u8>>, LinkError> {
        self.inner.probe()
    }

    fn get(&self, feature: Feature) -> Result<u8, LinkError> {
        self.inner.get(feature)
    }

    fn set(&self, feature: Feature, value: u8) -> Result<(), LinkError> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        self.inner.set(feature, value)
    }
}

/// Enabled display on a fake link, without contrast tracking
pub fn test_display(id: &str, name: &str, link: &Arc<FakeLink>) -> Arc<Display> {
    Arc::new(Display::new(
        DisplayId::new(id),
        name,
        link.clone(),
        true,
        false,
    ))
}

/// Observer that records every notification
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(DisplayId, Feature, u8)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(DisplayId, Feature, u8)> {
        self.events.lock().unwrap().clone()
    }
}

impl DisplayObserver for RecordingObserver {
    fn feature_changed(&self, display: &DisplayId, feature: Feature, value: u8) {
        self.events
            .lock()
            .unwrap()
            .push((display.clone(), feature, value));
    }
}

/// Mutable set of screens and their links
#[derive(Default)]
pub struct FakeWorld {
    screens: Mutex<Vec<Screen>>,
    links: Mutex<HashMap<DisplayId, Arc<FakeLink>>>,
    fail_screens: AtomicBool,
    pointer: Mutex<Option<DisplayId>>,
}

impl FakeWorld {
    pub fn add_screen(&self, id: &str, builtin: bool, link: Option<Arc<FakeLink>>) {
        let id = DisplayId::new(id);
        if let Some(link) = link {
            self.links.lock().unwrap().insert(id.clone(), link);
        }
        self.screens.lock().unwrap().push(Screen { id, builtin });
    }

    pub fn remove_screen(&self, id: &str) {
        let id = DisplayId::new(id);
        self.screens.lock().unwrap().retain(|s| s.id != id);
        self.links.lock().unwrap().remove(&id);
    }

    pub fn set_pointer(&self, id: Option<&str>) {
        *self.pointer.lock().unwrap() = id.map(DisplayId::new);
    }
}

impl ScreenSource for FakeWorld {
    fn screens(&self) -> Result<Vec<Screen>, ScreenError> {
        if self.fail_screens.load(Ordering::SeqCst) {
            return Err(ScreenError::Enumerate(std::io::Error::other("no display server")));
        }
        Ok(self.screens.lock().unwrap().clone())
    }

    fn pointer_screen(&self) -> Option<DisplayId> {
        self.pointer.lock().unwrap().clone()
    }
}

impl LinkFactory for FakeWorld {
    fn open(&self, screen: &Screen) -> Result<Arc<dyn HardwareLink>, LinkError> {
        let link = self.links.lock().unwrap().get(&screen.id).cloned();
        match link {
            Some(link) => Ok(link),
            None => Err(LinkError::NoBus(screen.id.to_string())),
        }
    }
}

/// Audio route with a settable output name
#[derive(Default)]
pub struct FakeAudio {
    name: Mutex<Option<String>>,
}

impl FakeAudio {
    pub fn set(&self, name: Option<&str>) {
        *self.name.lock().unwrap() = name.map(str::to_string);
    }
}

impl AudioRoute for FakeAudio {
    fn current_output(&self) -> Option<AudioOutput> {
        self.name.lock().unwrap().clone().map(|name| AudioOutput {
            id: format!("sink.{name}"),
            name,
        })
    }
}

/// Builder for an [`AppContext`] over fakes
#[derive(Default)]
pub struct ContextBuilder {
    world: Arc<FakeWorld>,
    audio: Arc<FakeAudio>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(self, id: &str, link: Arc<FakeLink>) -> Self {
        self.world.add_screen(id, false, Some(link));
        self
    }

    pub fn builtin(self, id: &str) -> Self {
        self.world.add_screen(id, true, Some(FakeLink::named("Built-in")));
        self
    }

    /// An external screen whose link cannot be opened
    pub fn unlinked(self, id: &str) -> Self {
        self.world.add_screen(id, false, None);
        self
    }

    pub fn failing_screens(self) -> Self {
        self.world.fail_screens.store(true, Ordering::SeqCst);
        self
    }

    pub fn audio_output(self, name: &str) -> Self {
        self.audio.set(Some(name));
        self
    }

    pub fn world(&self) -> Arc<FakeWorld> {
        Arc::clone(&self.world)
    }

    pub fn audio(&self) -> Arc<FakeAudio> {
        Arc::clone(&self.audio)
    }

    pub fn build(self) -> AppContext {
        AppContext {
            prefs: Preferences::new(Arc::new(JsonPreferences::in_memory())),
            links: self.world.clone(),
            screens: self.world,
            audio: self.audio,
        }
    }
}

#[derive(Default)]
struct TapState {
    next_id: AtomicU64,
    created: AtomicUsize,
    fail_start: AtomicBool,
    live: Mutex<HashMap<u64, KeySet>>,
}

/// Key-tap factory that tracks live registrations
#[derive(Default)]
pub struct FakeTapFactory {
    state: Arc<TapState>,
}

impl FakeTapFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live_count(&self) -> usize {
        self.state.live.lock().unwrap().len()
    }

    pub fn live_keys(&self) -> Vec<KeySet> {
        self.state.live.lock().unwrap().values().copied().collect()
    }

    pub fn created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    pub fn fail_starts(&self, fail: bool) {
        self.state.fail_start.store(fail, Ordering::SeqCst);
    }
}

impl KeyTapFactory for FakeTapFactory {
    fn create(&self, keys: KeySet) -> Box<dyn KeyTap> {
        self.state.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeTap {
            id: self.state.next_id.fetch_add(1, Ordering::SeqCst),
            keys,
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeTap {
    id: u64,
    keys: KeySet,
    state: Arc<TapState>,
}

impl KeyTap for FakeTap {
    fn keys(&self) -> KeySet {
        self.keys
    }

    fn start(&mut self) -> Result<(), TapError> {
        if self.state.fail_start.load(Ordering::SeqCst) {
            return Err(TapError::AlreadyRunning);
        }
        let mut live = self.state.live.lock().unwrap();
        if live.insert(self.id, self.keys).is_some() {
            return Err(TapError::AlreadyRunning);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.state.live.lock().unwrap().remove(&self.id);
    }
}
