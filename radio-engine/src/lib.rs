//! # Radio Session Engine
//!
//! Audio-focus-aware playback engine for a single live stream.
//!
//! ## Overview
//!
//! The engine owns exactly one Media Engine player, one audio-focus grant,
//! one foreground notification lease and one CPU wake lock. Three independent sources feed it:
//! caller commands, player callbacks and OS focus changes. All of them are
//! queued as `EngineInput`s and applied in arrival order by a single engine
//! thread, under the `Session` monitor lock.
//!
//! ## Key Features
//!
//! - **Sync API**: commands enqueue and return, outcomes arrive as published events
//! - **Single transition function**: every state change happens in `PlaybackCore::handle`
//! - **Focus arbitration**: grant reuse per category, ducking, transient pause and resume
//! - **Live-edge recovery**: "behind live window" errors reseek in place without an event
//! - **Collaborator traits**: Media Engine, focus backend, notification and wake-lock hosts are pluggable
//!
//! ## Architecture
//!
//! ```text
//! PlaybackEngine (handle)
//!     │ mpsc::Sender<EngineInput>
//!     ▼
//! engine thread ── lock Session ── PlaybackCore::handle ── unlock
//!     │                                  │
//!     │           MediaPlayer / AudioFocusArbiter / NotificationHost / WakeLockHost
//!     ▼
//! ListenerFanout::publish (outside the lock)
//!
//! PlayerEventSink ──┐
//! FocusChangeSink ──┴── mpsc::Sender<EngineInput>
//! ```
//!
//! ## Testing
//!
//! The `test-support` feature exposes recording mocks in [`testing`].

pub mod config;
pub mod engine;
pub mod error;
pub mod focus;
pub mod machine;
pub mod media;
pub mod notification;
pub mod power;
pub mod session;
pub mod types;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::EngineConfig;
pub use engine::{EngineServices, PlaybackEngine};
pub use error::{EngineError, LeaseError, MediaError, Result};
pub use focus::{
    AudioFocusArbiter, FocusBackend, FocusChangeSink, FocusEvent, FocusRequestResult,
    TelephonyState,
};
pub use machine::{EngineInput, PlaybackCore};
pub use media::{
    MediaEngine, MediaErrorCode, MediaPlayer, PlayerConfig, PlayerEvent, PlayerEventSink,
};
pub use notification::{
    ChannelConfig, LeaseId, LeaseOrigin, NotificationHost, NotificationLease,
};
pub use power::{WakeLockHost, WakeLockId, DEFAULT_WAKE_LOCK_TAG};
pub use session::{Session, SessionSnapshot, SharedSession};
pub use worker::on_engine_thread;
pub use types::{AudioUsage, PlayRequest, PlaybackState, StreamCategory, StreamDescriptor};

// Re-export the event types the engine publishes
pub use session_fanout::{ListenerFanout, SessionEvent, SessionFailure};
