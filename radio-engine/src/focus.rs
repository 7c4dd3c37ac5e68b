//! Audio focus arbitration
//!
//! `AudioFocusArbiter` gates playback on exclusive output ownership. The OS
//! side lives behind `FocusBackend`; focus changes come back through a
//! `FocusChangeSink` and are queued as engine inputs like every other event.
//! Every backend request opens a new grant, and changes reported for an
//! older grant are dropped the same way stale player callbacks are.

use std::sync::{mpsc, Arc};

use crate::machine::EngineInput;
use crate::types::{AudioUsage, StreamCategory};

/// Android `AUDIOFOCUS_GAIN`
pub const FOCUS_GAIN: i32 = 1;
/// Android `AUDIOFOCUS_LOSS`
pub const FOCUS_LOSS: i32 = -1;
/// Android `AUDIOFOCUS_LOSS_TRANSIENT`
pub const FOCUS_LOSS_TRANSIENT: i32 = -2;
/// Android `AUDIOFOCUS_LOSS_TRANSIENT_CAN_DUCK`
pub const FOCUS_LOSS_TRANSIENT_CAN_DUCK: i32 = -3;

/// Outcome of a focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequestResult {
    Granted,
    Denied,
}

/// Focus change reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    /// Another app took output indefinitely
    Lost,
    /// Brief interruption, playback must pause
    LostTransient,
    /// Brief interruption, playback may continue quietly
    LostTransientCanDuck,
    Regained,
}

impl FocusEvent {
    /// Translate an OS focus-change code, `None` for unknown codes
    pub fn from_android_code(code: i32) -> Option<Self> {
        match code {
            FOCUS_GAIN => Some(Self::Regained),
            FOCUS_LOSS => Some(Self::Lost),
            FOCUS_LOSS_TRANSIENT => Some(Self::LostTransient),
            FOCUS_LOSS_TRANSIENT_CAN_DUCK => Some(Self::LostTransientCanDuck),
            _ => None,
        }
    }
}

/// Call state used as an extra interruption source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelephonyState {
    Idle,
    Ringing,
    OffHook,
}

impl TelephonyState {
    /// Focus event this call state stands for
    pub fn focus_event(self) -> FocusEvent {
        match self {
            Self::Ringing | Self::OffHook => FocusEvent::LostTransient,
            Self::Idle => FocusEvent::Regained,
        }
    }
}

/// OS audio-focus primitive
pub trait FocusBackend: Send + Sync {
    /// Ask for output focus, change notifications go to `changes`
    fn request(&self, usage: AudioUsage, changes: FocusChangeSink) -> FocusRequestResult;
    fn abandon(&self);
}

/// Delivers OS focus changes to the engine queue
///
/// Sinks handed to `FocusBackend::request` are stamped with the grant they
/// were issued for. Unstamped sinks report against whatever grant is current.
#[derive(Debug, Clone)]
pub struct FocusChangeSink {
    tx: mpsc::Sender<EngineInput>,
    grant: Option<u64>,
}

impl FocusChangeSink {
    pub(crate) fn new(tx: mpsc::Sender<EngineInput>) -> Self {
        Self { tx, grant: None }
    }

    pub(crate) fn for_grant(tx: mpsc::Sender<EngineInput>, grant: u64) -> Self {
        Self {
            tx,
            grant: Some(grant),
        }
    }

    /// Grant this sink reports for, `None` for the current one
    pub fn grant(&self) -> Option<u64> {
        self.grant
    }

    pub fn deliver(&self, event: FocusEvent) {
        let input = EngineInput::Focus {
            grant: self.grant,
            event,
        };
        if self.tx.send(input).is_err() {
            tracing::trace!("Engine gone, dropping focus event {:?}", event);
        }
    }

    /// Deliver a raw OS focus-change code
    pub fn deliver_os_code(&self, code: i32) {
        match FocusEvent::from_android_code(code) {
            Some(event) => self.deliver(event),
            None => tracing::debug!("Ignoring unknown focus change code {}", code),
        }
    }

    pub fn deliver_telephony(&self, state: TelephonyState) {
        self.deliver(state.focus_event());
    }
}

/// Tracks the focus grant held on behalf of the engine
pub struct AudioFocusArbiter {
    backend: Arc<dyn FocusBackend>,
    changes: mpsc::Sender<EngineInput>,
    held: Option<StreamCategory>,
    /// Number of the most recent backend request
    grant: u64,
}

impl AudioFocusArbiter {
    pub fn new(backend: Arc<dyn FocusBackend>, changes: mpsc::Sender<EngineInput>) -> Self {
        Self {
            backend,
            changes,
            held: None,
            grant: 0,
        }
    }

    /// Request focus for `category`
    ///
    /// An unchanged category reuses the current grant. A different category
    /// abandons the old grant and issues a fresh request.
    pub fn request_focus(&mut self, category: StreamCategory) -> FocusRequestResult {
        match self.held {
            Some(held) if held == category => {
                tracing::debug!("Reusing focus grant for {}", category);
                return FocusRequestResult::Granted;
            }
            Some(held) => {
                tracing::debug!("Focus category changed from {} to {}", held, category);
                self.backend.abandon();
                self.held = None;
            }
            None => {}
        }
        self.request_from_backend(category)
    }

    /// Drop any held grant and ask the backend again, even for an
    /// unchanged category
    pub fn renew_focus(&mut self, category: StreamCategory) -> FocusRequestResult {
        if self.held.take().is_some() {
            self.backend.abandon();
        }
        self.request_from_backend(category)
    }

    fn request_from_backend(&mut self, category: StreamCategory) -> FocusRequestResult {
        self.grant += 1;
        let changes = FocusChangeSink::for_grant(self.changes.clone(), self.grant);
        let result = self.backend.request(category.usage(), changes);
        if result == FocusRequestResult::Granted {
            self.held = Some(category);
        }
        tracing::debug!("Focus request {} for {}: {:?}", self.grant, category, result);
        result
    }

    /// Release any held grant, no-op when none is held
    pub fn abandon_focus(&mut self) {
        if self.held.take().is_some() {
            self.backend.abandon();
            tracing::debug!("Abandoned audio focus");
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Whether a change stamped with `grant` applies to the held grant
    pub fn accepts(&self, grant: Option<u64>) -> bool {
        self.held.is_some() && grant.map_or(true, |grant| grant == self.grant)
    }
}

impl std::fmt::Debug for AudioFocusArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFocusArbiter")
            .field("held", &self.held)
            .field("grant", &self.grant)
            .finish()
    }
}
