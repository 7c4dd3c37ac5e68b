use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously by the session broker
///
/// None of these are ever broadcast to subscribers; failures that change the
/// shared playback state arrive as `SessionEvent::Error` instead.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The request is not valid before `initialize`
    #[error("Session not initialized")]
    NotInitialized,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session already initialized")]
    AlreadyInitialized,

    /// Attaching to the engine host failed
    #[error("Engine host attachment failed: {0}")]
    HostAttachment(#[from] HostError),

    #[error("Engine error: {0}")]
    Engine(#[from] radio_engine::EngineError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SessionError {
    /// Whether this error rejects a request made in the wrong lifecycle state
    pub fn is_invalid_state_request(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::AlreadyInitialized)
    }
}

/// Errors reported by an engine host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Engine host unavailable: {0}")]
    Unavailable(String),

    #[error("Engine host refused binding: {0}")]
    BindRefused(String),

    /// The attachment was superseded by a disconnect
    #[error("Engine host attachment cancelled")]
    Cancelled,
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
