//! Handle to a running playback engine

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use session_fanout::{ListenerFanout, SessionEvent};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::focus::{FocusBackend, FocusChangeSink, FocusEvent};
use crate::machine::{EngineInput, PlaybackCore};
use crate::media::MediaEngine;
use crate::notification::NotificationHost;
use crate::power::WakeLockHost;
use crate::session::SharedSession;
use crate::types::{PlayRequest, PlaybackState};
use crate::worker::spawn_engine_worker;

/// Collaborators an engine host provides once attached
#[derive(Clone)]
pub struct EngineServices {
    pub media: Arc<dyn MediaEngine>,
    pub focus: Arc<dyn FocusBackend>,
    pub notifications: Arc<dyn NotificationHost>,
    pub power: Arc<dyn WakeLockHost>,
}

impl std::fmt::Debug for EngineServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineServices").finish_non_exhaustive()
    }
}

/// Running playback engine
///
/// All methods enqueue an input for the engine thread and return without
/// waiting for the outcome, which is published to the fan-out later.
/// The handle can be shared behind an `Arc`; dropping the last reference
/// shuts the engine down.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use radio_engine::{EngineConfig, PlaybackEngine, PlayRequest, Session, StreamDescriptor};
/// use session_fanout::ListenerFanout;
///
/// let session = Session::shared();
/// session.lock().set_descriptor(StreamDescriptor::new("https://radio.example/live", false));
///
/// let engine = PlaybackEngine::start(
///     services,
///     Arc::new(ListenerFanout::new()),
///     session,
///     EngineConfig::default(),
/// )?;
/// engine.play(PlayRequest::default())?;
/// ```
pub struct PlaybackEngine {
    input_tx: mpsc::Sender<EngineInput>,
    session: SharedSession,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    stopped: AtomicBool,
}

impl PlaybackEngine {
    /// Take over the session, acquire the host leases and start the engine thread
    pub fn start(
        services: EngineServices,
        fanout: Arc<ListenerFanout>,
        session: SharedSession,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (input_tx, input_rx) = mpsc::channel();
        let mut core = PlaybackCore::new(config, services, input_tx.clone());
        core.attach(&mut session.lock());

        let worker = spawn_engine_worker(
            core,
            Arc::clone(&session),
            fanout,
            input_rx,
            input_tx.clone(),
        )?;
        let worker_id = worker.thread().id();

        Ok(Self {
            input_tx,
            session,
            worker: Mutex::new(Some(worker)),
            worker_id,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn play(&self, request: PlayRequest) -> Result<()> {
        self.send(EngineInput::Play(request))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(EngineInput::Stop)
    }

    /// Publish `event` after every input queued so far
    pub fn announce(&self, event: SessionEvent) -> Result<()> {
        self.send(EngineInput::Announce(event))
    }

    /// Apply `event` to whatever focus grant is current
    pub fn focus_event(&self, event: FocusEvent) -> Result<()> {
        self.send(EngineInput::Focus { grant: None, event })
    }

    /// Sink an OS focus listener can report into
    pub fn focus_sink(&self) -> FocusChangeSink {
        FocusChangeSink::new(self.input_tx.clone())
    }

    pub fn state(&self) -> PlaybackState {
        self.session.lock().state()
    }

    /// Block until the input queue is quiescent or `timeout` passes
    ///
    /// Returns false on timeout, or when called from the engine thread.
    pub fn settle(&self, timeout: Duration) -> bool {
        if thread::current().id() == self.worker_id {
            return false;
        }

        let (ack_tx, ack_rx) = mpsc::channel();
        if self.input_tx.send(EngineInput::Settle(ack_tx)).is_err() {
            return true;
        }
        match ack_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(mpsc::RecvTimeoutError::Disconnected) => true,
            Err(mpsc::RecvTimeoutError::Timeout) => false,
        }
    }

    /// Tear down on the engine thread, then publish `announce`
    ///
    /// Joins the worker unless called from the engine thread itself.
    /// Later calls are no-ops.
    pub fn shutdown(&self, announce: Option<SessionEvent>) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        if self.input_tx.send(EngineInput::Shutdown { announce }).is_err() {
            tracing::warn!("Engine worker already stopped");
        }

        if thread::current().id() == self.worker_id {
            tracing::debug!("Shutdown requested from the engine thread, not joining");
            self.worker.lock().take();
            return;
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("Engine worker panicked");
            }
        }
    }

    fn send(&self, input: EngineInput) -> Result<()> {
        self.input_tx
            .send(input)
            .map_err(|_| EngineError::WorkerDisconnected)
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown(None);
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("worker_id", &self.worker_id)
            .field("stopped", &self.stopped.load(Ordering::SeqCst))
            .finish()
    }
}
