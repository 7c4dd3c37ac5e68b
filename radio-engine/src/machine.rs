//! Playback state machine
//!
//! Every input the engine reacts to (caller commands, player callbacks and
//! OS focus changes) is an `EngineInput`. `PlaybackCore::handle` is the only
//! place the playback state changes; it runs with the session lock held and
//! returns the events to publish once the lock is released.

use std::sync::mpsc;
use std::sync::Arc;

use session_fanout::{SessionEvent, SessionFailure};

use crate::config::EngineConfig;
use crate::engine::EngineServices;
use crate::error::MediaError;
use crate::focus::{AudioFocusArbiter, FocusEvent, FocusRequestResult};
use crate::media::{
    MediaEngine, MediaErrorCode, MediaPlayer, PlayerConfig, PlayerEvent, PlayerEventSink,
};
use crate::notification::{NotificationHost, NotificationLease};
use crate::power::{WakeLockHost, WakeLockId};
use crate::session::Session;
use crate::types::{PlayRequest, PlaybackState, StreamCategory, StreamDescriptor};

/// Input consumed by the engine thread, in arrival order
#[derive(Debug)]
pub enum EngineInput {
    /// Start or resume playback
    Play(PlayRequest),
    /// Stop playback
    Stop,
    /// OS focus change, stamped with the grant it was reported for
    Focus { grant: Option<u64>, event: FocusEvent },
    /// Player callback, stamped with the player generation
    Player { generation: u64, event: PlayerEvent },
    /// Publish an event in queue order
    Announce(SessionEvent),
    /// Acknowledge once the queue is quiescent
    Settle(mpsc::Sender<()>),
    /// Tear down, publish the optional announcement and exit
    Shutdown { announce: Option<SessionEvent> },
}

/// Engine-owned resources and the transition function
pub struct PlaybackCore {
    config: EngineConfig,
    media: Arc<dyn MediaEngine>,
    notifications: Arc<dyn NotificationHost>,
    power: Arc<dyn WakeLockHost>,
    arbiter: AudioFocusArbiter,
    input_tx: mpsc::Sender<EngineInput>,

    player: Option<Box<dyn MediaPlayer>>,
    generation: u64,
    category: StreamCategory,
    lease: Option<NotificationLease>,
    wake_lock: Option<WakeLockId>,
    /// Session ownership epoch, see `Session::claim`
    epoch: u64,

    /// Current player has reported ready
    player_ready: bool,
    /// Current player went idle while paused and must be prepared again
    needs_prepare: bool,
    /// `Started` was already published for the current player
    started: bool,
    /// Playing at duck volume
    ducked: bool,
    /// A stop was issued and the player has not confirmed idle yet
    stop_pending: bool,
}

impl PlaybackCore {
    pub fn new(
        config: EngineConfig,
        services: EngineServices,
        input_tx: mpsc::Sender<EngineInput>,
    ) -> Self {
        let arbiter = AudioFocusArbiter::new(services.focus, input_tx.clone());
        Self {
            config,
            media: services.media,
            notifications: services.notifications,
            power: services.power,
            arbiter,
            input_tx,
            player: None,
            generation: 0,
            category: StreamCategory::default(),
            lease: None,
            wake_lock: None,
            epoch: 0,
            player_ready: false,
            needs_prepare: false,
            started: false,
            ducked: false,
            stop_pending: false,
        }
    }

    /// Take ownership of the session, acquire the notification lease and
    /// the wake lock
    ///
    /// A previously attached engine stops affecting the session from here on.
    /// Neither lease is required for playback; a refusal is only logged.
    pub fn attach(&mut self, session: &mut Session) {
        self.epoch = session.claim();
        match self.power.acquire_wake_lock(&self.config.wake_lock_tag) {
            Ok(id) => {
                tracing::debug!("Holding wake lock {} ({})", id, self.config.wake_lock_tag);
                self.wake_lock = Some(id);
            }
            Err(e) => tracing::warn!("Failed to acquire wake lock: {}", e),
        }
        match self.notifications.acquire_lease(&self.config.notification) {
            Ok(lease) => {
                tracing::debug!("Holding notification lease {} ({:?})", lease.id, lease.origin);
                self.lease = Some(lease);
                session.set_notification_lease_held(true);
            }
            Err(e) => {
                tracing::warn!("Failed to acquire notification lease: {}", e);
                session.set_notification_lease_held(false);
            }
        }
    }

    /// Apply one input and return the events it produces
    pub fn handle(&mut self, session: &mut Session, input: EngineInput) -> Vec<SessionEvent> {
        if !session.is_owned_by(self.epoch) {
            tracing::debug!("Session owned by a newer engine, dropping {:?}", input);
            return Vec::new();
        }

        match input {
            EngineInput::Play(request) => self.play(session, request),
            EngineInput::Stop => self.stop(session),
            EngineInput::Focus { grant, event } => self.on_focus(session, grant, event),
            EngineInput::Player { generation, event } => {
                self.on_player(session, generation, event)
            }
            EngineInput::Announce(event) => vec![event],
            EngineInput::Settle(_) | EngineInput::Shutdown { .. } => {
                tracing::debug!("Control input reached the transition function, ignoring");
                Vec::new()
            }
        }
    }

    fn play(&mut self, session: &mut Session, request: PlayRequest) -> Vec<SessionEvent> {
        let Some(descriptor) = session.descriptor().cloned() else {
            tracing::warn!("Play requested without a stream descriptor");
            return Vec::new();
        };
        let category = request.category.unwrap_or(self.category);

        if self.stop_pending {
            tracing::debug!("Play while a stop is pending, starting a fresh player");
            self.teardown();
            return self.start(session, &descriptor, category);
        }

        match session.state() {
            PlaybackState::Playing | PlaybackState::Loading => {
                if category == self.category {
                    tracing::debug!("Already {}, ignoring play", session.state());
                    return Vec::new();
                }
                self.reroute(category);
                match self.arbiter.request_focus(category) {
                    FocusRequestResult::Granted => Vec::new(),
                    FocusRequestResult::Denied => self.focus_denied(session),
                }
            }
            PlaybackState::StoppedFocusTransient => {
                self.reroute(category);
                match self.arbiter.renew_focus(category) {
                    FocusRequestResult::Granted => self.resume(session, &descriptor),
                    FocusRequestResult::Denied => self.focus_denied(session),
                }
            }
            PlaybackState::Idle
            | PlaybackState::Stopped
            | PlaybackState::Error
            | PlaybackState::StoppedFocusLoss => self.start(session, &descriptor, category),
        }
    }

    fn start(
        &mut self,
        session: &mut Session,
        descriptor: &StreamDescriptor,
        category: StreamCategory,
    ) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::Loading];
        session.transition(PlaybackState::Loading);
        self.category = category;
        self.stop_pending = false;

        if self.arbiter.request_focus(category) == FocusRequestResult::Denied {
            events.extend(self.focus_denied(session));
            return events;
        }

        if let Err(e) = self.ensure_player(descriptor) {
            tracing::warn!("Failed to create player for {}: {}", descriptor.url, e);
            self.teardown();
            session.transition(PlaybackState::Error);
            events.push(SessionEvent::Error(SessionFailure::PlayerCreation {
                message: e.to_string(),
            }));
            return events;
        }

        let full_volume = self.config.full_volume;
        if let Some(player) = self.player.as_mut() {
            player.set_volume(full_volume);
            player.set_play_when_ready(true);
        }
        self.ducked = false;
        events
    }

    /// Create the player if none exists, otherwise reuse it with the current routing
    fn ensure_player(&mut self, descriptor: &StreamDescriptor) -> Result<(), MediaError> {
        if let Some(player) = self.player.as_mut() {
            player.set_audio_usage(self.category.usage());
            return Ok(());
        }

        self.generation += 1;
        let sink = PlayerEventSink::new(self.generation, self.input_tx.clone());
        let config = PlayerConfig {
            uri: descriptor.url.clone(),
            usage: self.category.usage(),
            live_target_offset: self.config.live_target_offset(),
            max_playback_speed: self.config.max_playback_speed,
        };

        let mut player = self.media.create_player(config, sink)?;
        player.prepare(&descriptor.url);
        tracing::debug!("Created player generation {} for {}", self.generation, descriptor.url);

        self.player = Some(player);
        self.player_ready = false;
        self.needs_prepare = false;
        self.started = false;
        Ok(())
    }

    fn reroute(&mut self, category: StreamCategory) {
        if category == self.category {
            return;
        }
        tracing::debug!("Re-routing output from {} to {}", self.category, category);
        self.category = category;
        if let Some(player) = self.player.as_mut() {
            player.set_audio_usage(category.usage());
        }
    }

    fn focus_denied(&mut self, session: &mut Session) -> Vec<SessionEvent> {
        tracing::warn!("Audio focus denied");
        self.teardown();
        session.transition(PlaybackState::StoppedFocusLoss);
        vec![
            SessionEvent::Error(SessionFailure::FocusDenied),
            SessionEvent::StoppedFocusLoss,
        ]
    }

    /// Continue the existing player after a transient interruption
    fn resume(&mut self, session: &mut Session, descriptor: &StreamDescriptor) -> Vec<SessionEvent> {
        let full_volume = self.config.full_volume;
        let needs_prepare = std::mem::take(&mut self.needs_prepare);
        let Some(player) = self.player.as_mut() else {
            tracing::warn!("No player to resume");
            return Vec::new();
        };

        if needs_prepare {
            player.prepare(&descriptor.url);
        }
        player.set_volume(full_volume);
        player.set_play_when_ready(true);
        self.ducked = false;

        if !self.player_ready {
            session.transition(PlaybackState::Loading);
            return Vec::new();
        }

        session.transition(PlaybackState::Playing);
        vec![self.started_or_resumed()]
    }

    fn started_or_resumed(&mut self) -> SessionEvent {
        if std::mem::replace(&mut self.started, true) {
            SessionEvent::ResumedAfterTransientFocusLoss
        } else {
            SessionEvent::Started
        }
    }

    /// Stop playback
    ///
    /// A running player is stopped and released once it confirms idle. When
    /// there is nothing left to wait for, the stop completes immediately.
    fn stop(&mut self, session: &mut Session) -> Vec<SessionEvent> {
        let state = session.state();
        let already_idle = self.player.is_none() || self.needs_prepare;
        if already_idle
            && matches!(
                state,
                PlaybackState::StoppedFocusTransient | PlaybackState::StoppedFocusLoss
            )
        {
            tracing::debug!("Player already idle in {}, stopping now", state);
            self.teardown();
            session.transition(PlaybackState::Stopped);
            return vec![SessionEvent::Stopped];
        }

        match self.player.as_mut() {
            Some(player) if state.is_active() => {
                tracing::debug!("Stopping player from {}", state);
                self.stop_pending = true;
                player.stop();
                Vec::new()
            }
            _ => {
                tracing::debug!("Nothing to stop in {}", state);
                Vec::new()
            }
        }
    }

    fn on_focus(
        &mut self,
        session: &mut Session,
        grant: Option<u64>,
        event: FocusEvent,
    ) -> Vec<SessionEvent> {
        if !self.arbiter.accepts(grant) {
            tracing::debug!("Focus {:?} for grant {:?} is not current, ignoring", event, grant);
            return Vec::new();
        }

        let state = session.state();
        match event {
            FocusEvent::Lost if state.is_active() => {
                tracing::info!("Audio focus lost permanently");
                self.teardown();
                session.transition(PlaybackState::StoppedFocusLoss);
                vec![SessionEvent::StoppedFocusLoss]
            }
            FocusEvent::Lost => {
                self.arbiter.abandon_focus();
                Vec::new()
            }
            FocusEvent::LostTransient
                if matches!(state, PlaybackState::Playing | PlaybackState::Loading) =>
            {
                if let Some(player) = self.player.as_mut() {
                    player.set_play_when_ready(false);
                }
                session.transition(PlaybackState::StoppedFocusTransient);
                vec![SessionEvent::StoppedFocusTransient]
            }
            FocusEvent::LostTransientCanDuck
                if matches!(state, PlaybackState::Playing | PlaybackState::Loading) =>
            {
                let duck_volume = self.config.duck_volume;
                if let Some(player) = self.player.as_mut() {
                    player.set_volume(duck_volume);
                    self.ducked = true;
                }
                Vec::new()
            }
            FocusEvent::Regained if state == PlaybackState::StoppedFocusTransient => {
                match session.descriptor().cloned() {
                    Some(descriptor) => self.resume(session, &descriptor),
                    None => Vec::new(),
                }
            }
            FocusEvent::Regained if self.ducked => {
                let full_volume = self.config.full_volume;
                if let Some(player) = self.player.as_mut() {
                    player.set_volume(full_volume);
                }
                self.ducked = false;
                Vec::new()
            }
            _ => {
                tracing::debug!("Focus {:?} has no effect in {}", event, state);
                Vec::new()
            }
        }
    }

    fn on_player(
        &mut self,
        session: &mut Session,
        generation: u64,
        event: PlayerEvent,
    ) -> Vec<SessionEvent> {
        if generation != self.generation || self.player.is_none() {
            tracing::trace!("Dropping {:?} from stale player generation {}", event, generation);
            return Vec::new();
        }

        let state = session.state();
        match event {
            PlayerEvent::Ready => {
                self.player_ready = true;
                session.set_duration(self.player.as_ref().and_then(|p| p.duration()));
                if state == PlaybackState::Loading && self.arbiter.is_held() {
                    session.transition(PlaybackState::Playing);
                    vec![self.started_or_resumed()]
                } else {
                    Vec::new()
                }
            }
            PlayerEvent::Idle => self.on_idle(session, state),
            PlayerEvent::Error {
                code: MediaErrorCode::BehindLiveWindow,
                ..
            } => {
                tracing::info!("Player fell behind the live window, seeking to live edge");
                if let (Some(player), Some(descriptor)) =
                    (self.player.as_mut(), session.descriptor())
                {
                    player.seek_to_live_edge();
                    player.prepare(&descriptor.url);
                }
                Vec::new()
            }
            PlayerEvent::Error { code, message } => {
                tracing::warn!("Player error {}: {}", code.code(), message);
                self.teardown();
                session.transition(PlaybackState::Error);
                vec![SessionEvent::Error(SessionFailure::Media {
                    code: code.code(),
                    message,
                })]
            }
        }
    }

    fn on_idle(&mut self, session: &mut Session, state: PlaybackState) -> Vec<SessionEvent> {
        if self.stop_pending {
            self.teardown();
            session.transition(PlaybackState::Stopped);
            return vec![SessionEvent::Stopped];
        }

        match state {
            PlaybackState::Playing => {
                self.teardown();
                session.transition(PlaybackState::Stopped);
                vec![SessionEvent::Stopped]
            }
            PlaybackState::StoppedFocusTransient => {
                self.player_ready = false;
                self.needs_prepare = true;
                vec![SessionEvent::StoppedFocusTransient]
            }
            _ => {
                tracing::debug!("Player idle in {}, ignoring", state);
                Vec::new()
            }
        }
    }

    /// Release the player and abandon focus
    fn teardown(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.release();
            tracing::debug!("Released player generation {}", self.generation);
        }
        self.player_ready = false;
        self.needs_prepare = false;
        self.started = false;
        self.ducked = false;
        self.stop_pending = false;
        self.arbiter.abandon_focus();
    }

    /// Tear down everything the engine owns
    ///
    /// The session itself is only reset while this engine still owns it.
    pub fn destroy(&mut self, session: &mut Session) {
        self.teardown();

        if let Some(id) = self.wake_lock.take() {
            self.power.release_wake_lock(id);
            tracing::debug!("Released wake lock {}", id);
        }

        if let Some(lease) = self.lease.take() {
            let auto_kill = session
                .descriptor()
                .map(|d| d.auto_kill_notification_on_destroy)
                .unwrap_or(false);
            if lease.releases_on_destroy(auto_kill) {
                self.notifications.release_lease(lease.id);
                tracing::debug!("Released notification lease {}", lease.id);
            } else {
                tracing::debug!("Leaving inherited notification {} in place", lease.id);
            }
        }
        if session.is_owned_by(self.epoch) {
            session.set_notification_lease_held(false);
            session.reset_playback();
        }
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }
}

impl std::fmt::Debug for PlaybackCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCore")
            .field("generation", &self.generation)
            .field("category", &self.category)
            .field("has_player", &self.player.is_some())
            .field("player_ready", &self.player_ready)
            .field("ducked", &self.ducked)
            .field("stop_pending", &self.stop_pending)
            .field("wake_lock", &self.wake_lock)
            .finish()
    }
}
