//! Recording mock collaborators
//!
//! Available with the `test-support` feature. Each mock is cheap to clone;
//! clones share the same recorded state, so a test keeps one copy for
//! assertions and hands another to the engine.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::EngineServices;
use crate::error::{LeaseError, MediaError};
use crate::focus::{FocusBackend, FocusChangeSink, FocusEvent, FocusRequestResult};
use crate::media::{MediaEngine, MediaErrorCode, MediaPlayer, PlayerConfig, PlayerEventSink};
use crate::notification::{
    ChannelConfig, LeaseId, LeaseOrigin, NotificationHost, NotificationLease,
};
use crate::power::{WakeLockHost, WakeLockId};
use crate::types::AudioUsage;

/// A call issued to a mock player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Prepare(String),
    PlayWhenReady(bool),
    Volume(f32),
    Stop,
    Release,
    SeekToLiveEdge,
    AudioUsage(AudioUsage),
}

#[derive(Default)]
struct MediaState {
    created: AtomicU32,
    auto_ready: AtomicBool,
    auto_idle_on_stop: AtomicBool,
    creation_error: Mutex<Option<String>>,
    duration: Mutex<Option<Duration>>,
    calls: Mutex<Vec<(u64, PlayerCall)>>,
    configs: Mutex<Vec<PlayerConfig>>,
    sinks: Mutex<Vec<PlayerEventSink>>,
    /// Idle flag of every created player, in creation order
    idle: Mutex<Vec<Arc<AtomicBool>>>,
}

/// Media Engine that records every player call
///
/// By default players report ready as soon as they are told to play and
/// report idle when stopped. A player that is already idle does not report
/// idle again.
#[derive(Clone)]
pub struct MockMediaEngine {
    state: Arc<MediaState>,
}

impl MockMediaEngine {
    pub fn new() -> Self {
        let state = MediaState::default();
        state.auto_ready.store(true, Ordering::SeqCst);
        state.auto_idle_on_stop.store(true, Ordering::SeqCst);
        Self {
            state: Arc::new(state),
        }
    }

    /// Players wait for `emit_ready` instead of reporting ready on their own
    pub fn manual_ready(self) -> Self {
        self.state.auto_ready.store(false, Ordering::SeqCst);
        self
    }

    /// Players do not report idle when stopped
    pub fn manual_idle(self) -> Self {
        self.state.auto_idle_on_stop.store(false, Ordering::SeqCst);
        self
    }

    pub fn set_auto_ready(&self, enabled: bool) {
        self.state.auto_ready.store(enabled, Ordering::SeqCst);
    }

    /// Make the next player creations fail, `None` restores success
    pub fn fail_creation(&self, message: Option<&str>) {
        *self.state.creation_error.lock() = message.map(str::to_string);
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        *self.state.duration.lock() = duration;
    }

    pub fn created_count(&self) -> u32 {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Every call, tagged with the generation of the player that received it
    pub fn calls(&self) -> Vec<(u64, PlayerCall)> {
        self.state.calls.lock().clone()
    }

    pub fn count_calls(&self, call: &PlayerCall) -> usize {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|(_, c)| c == call)
            .count()
    }

    pub fn last_config(&self) -> Option<PlayerConfig> {
        self.state.configs.lock().last().cloned()
    }

    /// Sink of the most recently created player
    pub fn last_sink(&self) -> Option<PlayerEventSink> {
        self.state.sinks.lock().last().cloned()
    }

    pub fn emit_ready(&self) {
        if let Some(sink) = self.last_sink() {
            sink.ready();
        }
    }

    /// Report idle from the most recent player and mark it idle
    pub fn emit_idle(&self) {
        if let Some(idle) = self.state.idle.lock().last() {
            idle.store(true, Ordering::SeqCst);
        }
        if let Some(sink) = self.last_sink() {
            sink.idle();
        }
    }

    /// Whether the most recent player is idle
    pub fn is_idle(&self) -> bool {
        self.state
            .idle
            .lock()
            .last()
            .map(|idle| idle.load(Ordering::SeqCst))
            .unwrap_or(true)
    }

    pub fn emit_error(&self, code: i32, message: &str) {
        if let Some(sink) = self.last_sink() {
            sink.error(MediaErrorCode::from_code(code), message);
        }
    }
}

impl Default for MockMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for MockMediaEngine {
    fn create_player(
        &self,
        config: PlayerConfig,
        events: PlayerEventSink,
    ) -> Result<Box<dyn MediaPlayer>, MediaError> {
        if let Some(message) = self.state.creation_error.lock().clone() {
            return Err(MediaError::Creation(message));
        }

        self.state.created.fetch_add(1, Ordering::SeqCst);
        self.state.configs.lock().push(config);
        self.state.sinks.lock().push(events.clone());
        let idle = Arc::new(AtomicBool::new(true));
        self.state.idle.lock().push(Arc::clone(&idle));

        Ok(Box::new(MockPlayer {
            generation: events.generation(),
            events,
            idle,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockPlayer {
    generation: u64,
    events: PlayerEventSink,
    /// Not prepared, or stopped since the last prepare
    idle: Arc<AtomicBool>,
    state: Arc<MediaState>,
}

impl MockPlayer {
    fn record(&self, call: PlayerCall) {
        self.state.calls.lock().push((self.generation, call));
    }
}

impl MediaPlayer for MockPlayer {
    fn prepare(&mut self, uri: &str) {
        self.record(PlayerCall::Prepare(uri.to_string()));
        self.idle.store(false, Ordering::SeqCst);
    }

    fn set_play_when_ready(&mut self, play: bool) {
        self.record(PlayerCall::PlayWhenReady(play));
        if play && self.state.auto_ready.load(Ordering::SeqCst) {
            self.events.ready();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(PlayerCall::Volume(volume));
    }

    fn stop(&mut self) {
        self.record(PlayerCall::Stop);
        let auto_idle = self.state.auto_idle_on_stop.load(Ordering::SeqCst);
        if auto_idle && !self.idle.swap(true, Ordering::SeqCst) {
            self.events.idle();
        }
    }

    fn release(&mut self) {
        self.record(PlayerCall::Release);
        self.idle.store(true, Ordering::SeqCst);
    }

    fn seek_to_live_edge(&mut self) {
        self.record(PlayerCall::SeekToLiveEdge);
    }

    fn set_audio_usage(&mut self, usage: AudioUsage) {
        self.record(PlayerCall::AudioUsage(usage));
    }

    fn duration(&self) -> Option<Duration> {
        *self.state.duration.lock()
    }
}

#[derive(Default)]
struct FocusState {
    deny: AtomicBool,
    requests: AtomicU32,
    abandons: AtomicU32,
    usages: Mutex<Vec<AudioUsage>>,
    changes: Mutex<Option<FocusChangeSink>>,
}

/// Focus backend that grants by default and lets tests inject OS changes
#[derive(Clone, Default)]
pub struct MockFocusBackend {
    state: Arc<FocusState>,
}

impl MockFocusBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_deny(&self, deny: bool) {
        self.state.deny.store(deny, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> u32 {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn abandon_count(&self) -> u32 {
        self.state.abandons.load(Ordering::SeqCst)
    }

    pub fn requested_usages(&self) -> Vec<AudioUsage> {
        self.state.usages.lock().clone()
    }

    /// Sink handed over with the most recent request
    pub fn last_sink(&self) -> Option<FocusChangeSink> {
        self.state.changes.lock().clone()
    }

    /// Deliver a focus change as the OS would
    ///
    /// Returns false if no request has been made yet.
    pub fn emit(&self, event: FocusEvent) -> bool {
        match self.state.changes.lock().as_ref() {
            Some(sink) => {
                sink.deliver(event);
                true
            }
            None => false,
        }
    }
}

impl FocusBackend for MockFocusBackend {
    fn request(&self, usage: AudioUsage, changes: FocusChangeSink) -> FocusRequestResult {
        self.state.requests.fetch_add(1, Ordering::SeqCst);
        self.state.usages.lock().push(usage);
        *self.state.changes.lock() = Some(changes);
        if self.state.deny.load(Ordering::SeqCst) {
            FocusRequestResult::Denied
        } else {
            FocusRequestResult::Granted
        }
    }

    fn abandon(&self) {
        self.state.abandons.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct NotificationState {
    inherit: AtomicBool,
    refuse: AtomicBool,
    acquired: Mutex<Vec<NotificationLease>>,
    released: Mutex<Vec<LeaseId>>,
}

/// Notification host that records lease traffic
#[derive(Clone, Default)]
pub struct MockNotificationHost {
    state: Arc<NotificationState>,
}

impl MockNotificationHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend another feature already shows a foreground notification
    pub fn inheriting(self) -> Self {
        self.state.inherit.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> Vec<NotificationLease> {
        self.state.acquired.lock().clone()
    }

    pub fn released(&self) -> Vec<LeaseId> {
        self.state.released.lock().clone()
    }
}

impl NotificationHost for MockNotificationHost {
    fn acquire_lease(&self, channel: &ChannelConfig) -> Result<NotificationLease, LeaseError> {
        if self.state.refuse.load(Ordering::SeqCst) {
            return Err(LeaseError::Refused("mock host refused".to_string()));
        }

        let lease = match channel.inherit_notification_id {
            Some(id) if self.state.inherit.load(Ordering::SeqCst) => NotificationLease {
                id,
                origin: LeaseOrigin::Inherited,
            },
            _ => NotificationLease {
                id: channel.notification_id,
                origin: LeaseOrigin::Fresh,
            },
        };
        self.state.acquired.lock().push(lease);
        Ok(lease)
    }

    fn release_lease(&self, id: LeaseId) {
        self.state.released.lock().push(id);
    }
}

#[derive(Default)]
struct WakeLockState {
    refuse: AtomicBool,
    next_id: AtomicU64,
    acquired: Mutex<Vec<(WakeLockId, String)>>,
    released: Mutex<Vec<WakeLockId>>,
}

/// Wake-lock host that records acquire and release calls
#[derive(Clone, Default)]
pub struct MockWakeLockHost {
    state: Arc<WakeLockState>,
}

impl MockWakeLockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn acquired_tags(&self) -> Vec<String> {
        self.state
            .acquired
            .lock()
            .iter()
            .map(|(_, tag)| tag.clone())
            .collect()
    }

    pub fn released(&self) -> Vec<WakeLockId> {
        self.state.released.lock().clone()
    }

    /// Locks acquired and not yet released
    pub fn held(&self) -> usize {
        let released = self.state.released.lock();
        self.state
            .acquired
            .lock()
            .iter()
            .filter(|(id, _)| !released.contains(id))
            .count()
    }
}

impl WakeLockHost for MockWakeLockHost {
    fn acquire_wake_lock(&self, tag: &str) -> Result<WakeLockId, LeaseError> {
        if self.state.refuse.load(Ordering::SeqCst) {
            return Err(LeaseError::WakeLockRefused("mock host refused".to_string()));
        }
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.acquired.lock().push((id, tag.to_string()));
        Ok(id)
    }

    fn release_wake_lock(&self, id: WakeLockId) {
        self.state.released.lock().push(id);
    }
}

/// One of each mock, sharing state with the services handed out
#[derive(Clone, Default)]
pub struct MockServices {
    pub media: MockMediaEngine,
    pub focus: MockFocusBackend,
    pub notifications: MockNotificationHost,
    pub power: MockWakeLockHost,
}

impl MockServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self) -> EngineServices {
        EngineServices {
            media: Arc::new(self.media.clone()),
            focus: Arc::new(self.focus.clone()),
            notifications: Arc::new(self.notifications.clone()),
            power: Arc::new(self.power.clone()),
        }
    }
}
