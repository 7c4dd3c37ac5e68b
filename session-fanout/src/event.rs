//! Session lifecycle events
//!
//! Every observable change of the playback session is expressed as a
//! `SessionEvent`. Events are delivered to subscribers in the order the
//! underlying transitions happened.

use serde::Serialize;

/// Why a session reported an error
///
/// Only failures that invalidate the shared playback state are broadcast.
/// Errors local to a single command are returned to that caller instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionFailure {
    /// The initial audio focus request was refused
    FocusDenied,

    /// The media engine reported an unrecoverable error
    Media {
        /// Engine specific error code
        code: i32,
        /// Human readable description from the engine
        message: String,
    },

    /// The media engine could not create a player instance
    PlayerCreation {
        /// Description of the creation failure
        message: String,
    },
}

impl std::fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFailure::FocusDenied => write!(f, "audio focus denied"),
            SessionFailure::Media { code, message } => {
                write!(f, "media error {}: {}", code, message)
            }
            SessionFailure::PlayerCreation { message } => {
                write!(f, "player creation failed: {}", message)
            }
        }
    }
}

/// An event published to every session subscriber
///
/// # Example
///
/// ```rust
/// use session_fanout::SessionEvent;
///
/// let event = SessionEvent::ResumedAfterTransientFocusLoss;
/// assert_eq!(event.wire_name(), "STARTED_FOCUS_TRANSIENT");
/// assert!(!event.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    /// A play request was accepted and the stream is buffering
    Loading,
    /// The playback engine host is attached
    Connected,
    /// The playback engine host was detached
    Disconnected,
    /// Playback started for the first time after a play request
    Started,
    /// Playback resumed after a transient focus loss
    ResumedAfterTransientFocusLoss,
    /// Playback stopped (explicit stop, natural end or engine idle)
    Stopped,
    /// Playback paused because another app briefly took audio focus
    StoppedFocusTransient,
    /// Playback stopped because audio focus was lost permanently
    StoppedFocusLoss,
    /// Playback failed
    Error(SessionFailure),
}

impl SessionEvent {
    /// Status string used by the command bridge
    pub fn wire_name(&self) -> &'static str {
        match self {
            SessionEvent::Loading => "LOADING",
            SessionEvent::Connected => "CONNECTED",
            SessionEvent::Disconnected => "DISCONNECTED",
            SessionEvent::Started => "STARTED",
            SessionEvent::ResumedAfterTransientFocusLoss => "STARTED_FOCUS_TRANSIENT",
            SessionEvent::Stopped => "STOPPED",
            SessionEvent::StoppedFocusTransient => "STOPPED_FOCUS_TRANSIENT",
            SessionEvent::StoppedFocusLoss => "STOPPED_FOCUS_LOSS",
            SessionEvent::Error(_) => "ERROR",
        }
    }

    /// Whether this event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::Error(_))
    }

    /// Whether this event concerns the host connection rather than playback
    pub fn is_connection_event(&self) -> bool {
        matches!(self, SessionEvent::Connected | SessionEvent::Disconnected)
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Error(failure) => write!(f, "ERROR ({})", failure),
            other => f.write_str(other.wire_name()),
        }
    }
}
