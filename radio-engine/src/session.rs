//! The process-wide playback context
//!
//! `Session` is the monitor every input serializes through. The broker owns
//! it behind a `SharedSession`; the engine thread locks it for the duration
//! of one transition and never while publishing.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{PlayRequest, PlaybackState, StreamDescriptor};

/// Session guarded by its monitor lock
pub type SharedSession = Arc<Mutex<Session>>;

/// Mutable fields of the single playback session
#[derive(Debug, Default)]
pub struct Session {
    state: PlaybackState,
    descriptor: Option<StreamDescriptor>,
    connected: bool,
    connecting: bool,
    pending_play: Option<PlayRequest>,
    notification_lease_held: bool,
    duration: Option<Duration>,
    /// Epoch of the engine allowed to drive this session
    owner: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session wrapped in its monitor
    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Move to `next`, only called by the transition function
    pub(crate) fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!("Playback state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    pub fn descriptor(&self) -> Option<&StreamDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn set_descriptor(&mut self, descriptor: StreamDescriptor) {
        self.descriptor = Some(descriptor);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn begin_connecting(&mut self) {
        self.connecting = true;
    }

    /// Record a finished attachment and hand back the deferred play, if any
    pub fn mark_connected(&mut self) -> Option<PlayRequest> {
        self.connected = true;
        self.connecting = false;
        self.pending_play.take()
    }

    /// Clear both connection flags and drop any deferred play
    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.connecting = false;
        self.pending_play = None;
    }

    /// Defer a play until the connection completes
    ///
    /// Ignored unless a connection is in progress.
    pub fn defer_play(&mut self, request: PlayRequest) {
        if self.connecting {
            self.pending_play = Some(request);
        } else {
            tracing::debug!("Not connecting, dropping deferred play");
        }
    }

    pub fn clear_pending_play(&mut self) {
        self.pending_play = None;
    }

    pub fn pending_play(&self) -> Option<PlayRequest> {
        self.pending_play
    }

    pub fn notification_lease_held(&self) -> bool {
        self.notification_lease_held
    }

    pub(crate) fn set_notification_lease_held(&mut self, held: bool) {
        self.notification_lease_held = held;
    }

    /// Duration reported by the current player, `None` while unknown
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub(crate) fn set_duration(&mut self, duration: Option<Duration>) {
        self.duration = duration;
    }

    /// Hand the session to a new engine, retiring any previous one
    pub(crate) fn claim(&mut self) -> u64 {
        self.owner += 1;
        self.owner
    }

    pub(crate) fn is_owned_by(&self, epoch: u64) -> bool {
        self.owner == epoch
    }

    /// Return to the state of a freshly created engine
    pub(crate) fn reset_playback(&mut self) {
        self.transition(PlaybackState::Idle);
        self.duration = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            descriptor: self.descriptor.clone(),
            connected: self.connected,
            connecting: self.connecting,
            pending_play: self.pending_play,
            notification_lease_held: self.notification_lease_held,
            duration: self.duration,
        }
    }
}

/// Point-in-time copy of the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub descriptor: Option<StreamDescriptor>,
    pub connected: bool,
    pub connecting: bool,
    pub pending_play: Option<PlayRequest>,
    pub notification_lease_held: bool,
    pub duration: Option<Duration>,
}
