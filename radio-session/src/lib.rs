//! # Radio Session - background live-radio playback
//!
//! Sync-first broker for a single live audio stream that keeps playing in
//! the background, follows the OS audio-focus rules and broadcasts its
//! lifecycle to any number of subscribers.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use radio_session::prelude::*;
//!
//! fn main() -> Result<(), SessionError> {
//!     radio_session::logging::init_logging_from_env().ok();
//!
//!     let broker = SessionBroker::with_defaults(Arc::new(MyServiceHost::new()))?;
//!     broker.subscribe(Arc::new(|event: &SessionEvent| {
//!         println!("radio: {}", event.wire_name());
//!     }));
//!
//!     broker.initialize(StreamDescriptor::new("https://radio.example/live.m3u8", true))?;
//!     broker.play(PlayRequest::from_code(3))?;  // CONNECTED, LOADING, STARTED
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Deferred play**: `play` before the engine host is attached is kept and replayed once
//! - **Audio focus**: transient pause and resume, ducking, permanent loss
//! - **Live streams**: falling behind the live window recovers in place
//! - **Ordered events**: subscribers see events in transition order, in registration order
//! - **Re-entrancy**: subscribers may call back into the broker from their handler
//!
//! ## Architecture
//!
//! ```text
//! radio-session (SessionBroker, EngineHost, SessionConfig, logging)
//!     ↓
//! radio-engine (PlaybackEngine, transition function, focus arbiter)
//!     ↓
//! session-fanout (SessionEvent, ListenerFanout, EventIterator)
//! ```

// Main exports
pub use broker::SessionBroker;
pub use config::SessionConfig;
pub use error::{HostError, Result, SessionError};
pub use host::{AttachCompletion, EngineHost, HostLink};

// Re-export the engine and event types callers work with
pub use radio_engine::{
    AudioUsage, ChannelConfig, EngineConfig, EngineServices, FocusBackend, FocusChangeSink,
    FocusEvent, FocusRequestResult, LeaseError, LeaseId, LeaseOrigin, MediaEngine, MediaError,
    MediaErrorCode, MediaPlayer, NotificationHost, NotificationLease, PlayRequest, PlaybackState,
    PlayerConfig, PlayerEventSink, SessionSnapshot, StreamCategory, StreamDescriptor,
    TelephonyState, WakeLockHost, WakeLockId,
};
pub use session_fanout::{
    channel_listener, EventIterator, ListenerHandle, SessionEvent, SessionFailure,
    SessionListener,
};

mod broker;
mod config;
mod error;
mod host;
pub mod logging;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        EngineHost, PlayRequest, PlaybackState, SessionBroker, SessionConfig, SessionError,
        SessionEvent, SessionListener, StreamCategory, StreamDescriptor,
    };
}
