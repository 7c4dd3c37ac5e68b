use thiserror::Error;

/// Errors that can occur in the playback engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid engine configuration
    #[error("Invalid engine configuration: {0}")]
    Configuration(String),

    /// The engine worker thread is gone
    #[error("Engine worker is no longer running")]
    WorkerDisconnected,

    /// Spawning the engine worker thread failed
    #[error("Failed to spawn engine worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Errors reported by a Media Engine implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The player instance could not be constructed
    #[error("Failed to create player: {0}")]
    Creation(String),

    /// The stream uri was rejected
    #[error("Invalid stream uri: {0}")]
    InvalidUri(String),
}

/// Errors reported by a notification or wake-lock host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// The host refused to grant a foreground notification
    #[error("Notification lease refused: {0}")]
    Refused(String),

    /// The notification channel could not be registered
    #[error("Notification channel {channel_id} unavailable: {reason}")]
    ChannelUnavailable { channel_id: String, reason: String },

    /// The host refused to keep the CPU awake
    #[error("Wake lock refused: {0}")]
    WakeLockRefused(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
