//! SessionBroker - process-wide single-session coordinator
//!
//! Owns the `Session`, the subscriber fan-out and, while connected, the
//! running `PlaybackEngine`. Commands are validated and applied in short
//! critical sections; everything that may call back into the broker (host
//! attachment, event delivery, engine joins) happens with no lock held.
//!
//! Connects and disconnects started outside the engine thread are serialized
//! by a re-entrant lifecycle lock, so an engine is fully torn down before the
//! next one attaches. Lock order is lifecycle, then control, then session.
//! The engine thread only ever takes the session lock.

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::sync::Arc;
use std::time::Duration;

use radio_engine::{
    on_engine_thread, EngineServices, FocusChangeSink, PlayRequest, PlaybackEngine,
    PlaybackState, Session, SessionSnapshot, SharedSession, StreamDescriptor, TelephonyState,
};
use session_fanout::{ListenerFanout, ListenerHandle, SessionEvent};

use crate::config::SessionConfig;
use crate::error::{HostError, Result, SessionError};
use crate::host::{AttachCompletion, EngineHost};

/// Broker state that is not part of the `Session`
#[derive(Debug, Default)]
struct BrokerControl {
    engine: Option<Arc<PlaybackEngine>>,
    /// Attachment attempt counter, bumped by every connect and disconnect
    generation: u64,
    /// A disconnect happened since the last `initialize`
    disconnected_since_init: bool,
    last_attach_error: Option<HostError>,
}

pub(crate) struct BrokerShared {
    lifecycle: ReentrantMutex<()>,
    session: SharedSession,
    control: Mutex<BrokerControl>,
    fanout: Arc<ListenerFanout>,
    host: Arc<dyn EngineHost>,
    config: SessionConfig,
}

impl BrokerShared {
    /// Lifecycle guard, skipped on the engine thread which a holder may be joining
    fn lifecycle(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        if on_engine_thread() {
            None
        } else {
            Some(self.lifecycle.lock())
        }
    }

    /// Apply the outcome of attachment attempt `generation`
    pub(crate) fn finish_attach(
        &self,
        generation: u64,
        outcome: std::result::Result<EngineServices, HostError>,
    ) {
        let mut detach = false;
        {
            let mut control = self.control.lock();
            if generation != control.generation || !self.session.lock().is_connecting() {
                tracing::debug!("Dropping completion of superseded attachment {}", generation);
                return;
            }

            let started = outcome.and_then(|services| {
                PlaybackEngine::start(
                    services,
                    Arc::clone(&self.fanout),
                    Arc::clone(&self.session),
                    self.config.engine.clone(),
                )
                .map_err(|e| HostError::Unavailable(e.to_string()))
            });

            match started {
                Ok(engine) => {
                    let pending = self.session.lock().mark_connected();
                    if let Err(e) = engine.announce(SessionEvent::Connected) {
                        tracing::warn!("Failed to announce connection: {}", e);
                    }
                    if let Some(request) = pending {
                        tracing::debug!("Replaying deferred play");
                        if let Err(e) = engine.play(request) {
                            tracing::warn!("Failed to replay deferred play: {}", e);
                        }
                    }
                    control.engine = Some(Arc::new(engine));
                    tracing::info!("Connected to engine host");
                }
                Err(e) => {
                    tracing::warn!("Engine host attachment failed: {}", e);
                    self.session.lock().mark_disconnected();
                    control.last_attach_error = Some(e);
                    detach = true;
                }
            }
        }

        if detach {
            self.host.detach();
        }
    }

    /// Forget the host of attachment `generation`, which went away on its own
    pub(crate) fn host_lost(&self, generation: u64) {
        let _lifecycle = self.lifecycle();
        let engine = {
            let mut control = self.control.lock();
            let mut session = self.session.lock();
            if generation != control.generation
                || !(session.is_connected() || session.is_connecting())
            {
                tracing::debug!("Ignoring loss of superseded host {}", generation);
                return;
            }
            session.mark_disconnected();
            drop(session);

            control.generation += 1;
            control.disconnected_since_init = true;
            control.engine.take()
        };

        tracing::warn!("Engine host {} lost", generation);
        match engine {
            Some(engine) => engine.shutdown(Some(SessionEvent::Disconnected)),
            None => {
                self.fanout.publish(&SessionEvent::Disconnected);
            }
        }
    }
}

/// Process-wide playback session coordinator
///
/// All methods are synchronous and return as soon as the request is
/// accepted. Outcomes are published to subscribers in transition order.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use radio_session::{PlayRequest, SessionBroker, SessionEvent, StreamDescriptor};
///
/// let broker = SessionBroker::with_defaults(host)?;
/// broker.subscribe(Arc::new(|event: &SessionEvent| println!("{}", event)));
///
/// broker.initialize(StreamDescriptor::new("https://radio.example/live.m3u8", true))?;
/// broker.play(PlayRequest::from_code(3))?;   // connects first, then plays
///
/// broker.stop()?;
/// broker.disconnect()?;
/// ```
pub struct SessionBroker {
    shared: Arc<BrokerShared>,
}

impl SessionBroker {
    /// Create a broker that attaches through `host`
    pub fn new(host: Arc<dyn EngineHost>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(BrokerShared {
                lifecycle: ReentrantMutex::new(()),
                session: Session::shared(),
                control: Mutex::new(BrokerControl::default()),
                fanout: Arc::new(ListenerFanout::new()),
                host,
                config,
            }),
        })
    }

    pub fn with_defaults(host: Arc<dyn EngineHost>) -> Result<Self> {
        Self::new(host, SessionConfig::default())
    }

    /// Store the stream to play
    ///
    /// Fails with `AlreadyInitialized` while connected or connecting, and
    /// when replacing a descriptor without an intervening disconnect unless
    /// re-initialisation is allowed by the config. Repeating the current
    /// descriptor always succeeds.
    pub fn initialize(&self, descriptor: StreamDescriptor) -> Result<()> {
        if descriptor.url.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "stream url must not be empty".to_string(),
            ));
        }

        let mut control = self.shared.control.lock();
        let mut session = self.shared.session.lock();

        if session.descriptor() == Some(&descriptor) {
            return Ok(());
        }
        if session.is_connected() || session.is_connecting() {
            return Err(SessionError::AlreadyInitialized);
        }
        if session.descriptor().is_some()
            && !self.shared.config.allow_reinitialize
            && !control.disconnected_since_init
        {
            return Err(SessionError::AlreadyInitialized);
        }

        tracing::debug!("Initialized stream {}", descriptor.url);
        session.set_descriptor(descriptor);
        control.disconnected_since_init = false;
        Ok(())
    }

    /// Attach to the engine host
    ///
    /// A no-op when already connected or connecting. An immediate host
    /// failure is returned here and never broadcast.
    pub fn connect(&self) -> Result<()> {
        self.begin_connect(None)
    }

    /// Start playback, connecting first if needed
    ///
    /// While not connected the request is kept as the single pending play
    /// and replayed once the connection completes.
    pub fn play(&self, request: PlayRequest) -> Result<()> {
        self.begin_connect(Some(request))
    }

    fn begin_connect(&self, request: Option<PlayRequest>) -> Result<()> {
        let _lifecycle = self.shared.lifecycle();
        let completion = {
            let mut control = self.shared.control.lock();
            let mut session = self.shared.session.lock();

            if session.descriptor().is_none() {
                return Err(SessionError::NotInitialized);
            }

            if session.is_connected() {
                if let Some(request) = request {
                    session.clear_pending_play();
                    drop(session);
                    if let Some(engine) = control.engine.as_ref() {
                        engine.play(request)?;
                    }
                }
                return Ok(());
            }

            if session.is_connecting() {
                if let Some(request) = request {
                    tracing::debug!("Connection in progress, deferring play");
                    session.defer_play(request);
                }
                return Ok(());
            }

            session.begin_connecting();
            if let Some(request) = request {
                session.defer_play(request);
            }
            control.generation += 1;
            control.last_attach_error = None;
            tracing::debug!("Attaching to engine host (attempt {})", control.generation);
            AttachCompletion::new(control.generation, Arc::downgrade(&self.shared))
        };

        let generation = completion.generation();
        if let Err(e) = self.shared.host.attach(completion) {
            tracing::warn!("Engine host attachment failed: {}", e);
            let mut control = self.shared.control.lock();
            if control.generation == generation {
                self.shared.session.lock().mark_disconnected();
                control.last_attach_error = Some(e.clone());
            }
            return Err(SessionError::HostAttachment(e));
        }
        Ok(())
    }

    /// Stop playback and cancel any pending play
    pub fn stop(&self) -> Result<()> {
        let control = self.shared.control.lock();
        let mut session = self.shared.session.lock();
        session.clear_pending_play();
        if session.is_connected() {
            drop(session);
            if let Some(engine) = control.engine.as_ref() {
                engine.stop()?;
            }
        }
        Ok(())
    }

    /// Detach from the engine host
    ///
    /// Cancels any pending play. When connected or connecting, tears the
    /// engine down and publishes `Disconnected` before returning, unless
    /// called from a subscriber on the engine thread.
    pub fn disconnect(&self) -> Result<()> {
        let _lifecycle = self.shared.lifecycle();
        let (engine, was_active) = {
            let mut control = self.shared.control.lock();
            let mut session = self.shared.session.lock();
            let was_active = session.is_connected() || session.is_connecting();
            session.mark_disconnected();
            drop(session);

            if was_active {
                control.generation += 1;
                control.disconnected_since_init = true;
            }
            (control.engine.take(), was_active)
        };

        if !was_active {
            return Ok(());
        }

        match engine {
            Some(engine) => engine.shutdown(Some(SessionEvent::Disconnected)),
            None => {
                self.shared.fanout.publish(&SessionEvent::Disconnected);
            }
        }
        self.shared.host.detach();
        tracing::info!("Disconnected from engine host");
        Ok(())
    }

    /// Register a subscriber, returns false if it was already registered
    pub fn subscribe(&self, listener: ListenerHandle) -> bool {
        self.shared.fanout.subscribe(listener)
    }

    pub fn unsubscribe(&self, listener: &ListenerHandle) -> bool {
        self.shared.fanout.unsubscribe(listener)
    }

    /// Replace every subscriber with `listener`
    pub fn set_sole_subscriber(&self, listener: ListenerHandle) {
        self.shared.fanout.set_sole_subscriber(listener);
    }

    /// Stream duration, `None` when not connected
    ///
    /// Live streams and streams that are not ready yet report zero.
    pub fn duration(&self) -> Option<Duration> {
        let session = self.shared.session.lock();
        if session.is_connected() {
            Some(session.duration().unwrap_or(Duration::ZERO))
        } else {
            None
        }
    }

    /// Duration in milliseconds, -1 when not connected
    pub fn duration_millis(&self) -> i64 {
        self.duration()
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(-1)
    }

    /// Feed a call-state change into the focus handling
    pub fn on_telephony_state(&self, state: TelephonyState) -> Result<()> {
        let control = self.shared.control.lock();
        match control.engine.as_ref() {
            Some(engine) => Ok(engine.focus_event(state.focus_event())?),
            None => {
                tracing::debug!("Not connected, ignoring telephony state {:?}", state);
                Ok(())
            }
        }
    }

    /// Sink for OS focus changes of the current engine, if connected
    pub fn focus_sink(&self) -> Option<FocusChangeSink> {
        self.shared
            .control
            .lock()
            .engine
            .as_ref()
            .map(|engine| engine.focus_sink())
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.session.lock().state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.session.lock().snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.session.lock().is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.shared.session.lock().is_connecting()
    }

    pub fn has_pending_play(&self) -> bool {
        self.shared.session.lock().pending_play().is_some()
    }

    /// Failure of the most recent attachment attempt, if it failed
    pub fn last_attach_error(&self) -> Option<HostError> {
        self.shared.control.lock().last_attach_error.clone()
    }

    /// Block until the engine has processed every queued input
    ///
    /// Returns true immediately when no engine is running.
    pub fn settle(&self, timeout: Duration) -> bool {
        let engine = self.shared.control.lock().engine.clone();
        match engine {
            Some(engine) => engine.settle(timeout),
            None => true,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }
}

impl Drop for SessionBroker {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            tracing::warn!("Failed to disconnect on drop: {}", e);
        }
    }
}

impl std::fmt::Debug for SessionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBroker")
            .field("session", &self.snapshot())
            .field("subscribers", &self.shared.fanout.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RefusingHost {
        attaches: AtomicU32,
        detaches: AtomicU32,
    }

    impl EngineHost for RefusingHost {
        fn attach(&self, _completion: AttachCompletion) -> std::result::Result<(), HostError> {
            self.attaches.fetch_add(1, Ordering::SeqCst);
            Err(HostError::Unavailable("test".to_string()))
        }

        fn detach(&self) {
            self.detaches.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn broker(config: SessionConfig) -> (SessionBroker, Arc<RefusingHost>) {
        let host = Arc::new(RefusingHost::default());
        let broker = SessionBroker::new(host.clone(), config).unwrap();
        (broker, host)
    }

    fn descriptor(url: &str) -> StreamDescriptor {
        StreamDescriptor::new(url, false)
    }

    #[test]
    fn test_requests_before_initialize() {
        let (broker, host) = broker(SessionConfig::default());

        assert!(matches!(broker.connect(), Err(SessionError::NotInitialized)));
        assert!(matches!(
            broker.play(PlayRequest::default()),
            Err(SessionError::NotInitialized)
        ));
        assert!(broker.stop().is_ok());
        assert!(broker.disconnect().is_ok());
        assert_eq!(host.attaches.load(Ordering::SeqCst), 0);
        assert_eq!(host.detaches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_initialize_rejects_empty_url() {
        let (broker, _host) = broker(SessionConfig::default());
        assert!(matches!(
            broker.initialize(descriptor("  ")),
            Err(SessionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reinitialize_allowed_by_default() {
        let (broker, _host) = broker(SessionConfig::default());
        broker.initialize(descriptor("https://a.example")).unwrap();
        broker.initialize(descriptor("https://b.example")).unwrap();
        assert_eq!(
            broker.snapshot().descriptor.map(|d| d.url),
            Some("https://b.example".to_string())
        );
    }

    #[test]
    fn test_strict_reinitialize() {
        let (broker, _host) = broker(SessionConfig::strict());
        broker.initialize(descriptor("https://a.example")).unwrap();

        // Same descriptor is idempotent
        broker.initialize(descriptor("https://a.example")).unwrap();
        assert!(matches!(
            broker.initialize(descriptor("https://b.example")),
            Err(SessionError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_immediate_attach_failure_is_returned() {
        let (broker, host) = broker(SessionConfig::default());
        broker.initialize(descriptor("https://a.example")).unwrap();

        let result = broker.play(PlayRequest::default());

        assert!(matches!(result, Err(SessionError::HostAttachment(_))));
        assert!(!broker.is_connecting());
        assert!(!broker.has_pending_play());
        assert_eq!(
            broker.last_attach_error(),
            Some(HostError::Unavailable("test".to_string()))
        );
        assert_eq!(host.attaches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duration_when_disconnected() {
        let (broker, _host) = broker(SessionConfig::default());
        assert_eq!(broker.duration(), None);
        assert_eq!(broker.duration_millis(), -1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SessionConfig::default();
        config.engine.duck_volume = -1.0;
        let result = SessionBroker::new(Arc::new(RefusingHost::default()), config);
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }
}
