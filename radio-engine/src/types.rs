//! Core value types shared by the engine and the broker

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output-routing classification of a stream
///
/// Values follow the platform stream-type constants the command bridge
/// passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamCategory(pub i32);

impl StreamCategory {
    /// Regular media playback
    pub const MUSIC: StreamCategory = StreamCategory(3);
    /// Alarm routing, audible when media is muted
    pub const ALARM: StreamCategory = StreamCategory(4);

    /// Audio usage attribute the player and focus request are configured with
    pub fn usage(self) -> AudioUsage {
        if self == Self::ALARM {
            AudioUsage::Alarm
        } else {
            AudioUsage::Media
        }
    }
}

impl Default for StreamCategory {
    fn default() -> Self {
        Self::MUSIC
    }
}

impl fmt::Display for StreamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::MUSIC => write!(f, "music"),
            Self::ALARM => write!(f, "alarm"),
            StreamCategory(other) => write!(f, "stream-type({})", other),
        }
    }
}

/// Audio attribute usage derived from a `StreamCategory`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioUsage {
    Media,
    Alarm,
}

/// A request to start playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayRequest {
    /// Requested category, `None` keeps the current one
    pub category: Option<StreamCategory>,
}

impl PlayRequest {
    /// Code used by the command bridge to keep the current category
    pub const KEEP_CURRENT: i32 = -1;

    pub fn new(category: StreamCategory) -> Self {
        Self {
            category: Some(category),
        }
    }

    /// Build a request from a bridge stream-type code
    pub fn from_code(code: i32) -> Self {
        if code == Self::KEEP_CURRENT {
            Self { category: None }
        } else {
            Self::new(StreamCategory(code))
        }
    }
}

/// What to play, fixed for the lifetime of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    /// Release the foreground notification on destroy even when it was inherited
    pub auto_kill_notification_on_destroy: bool,
}

impl StreamDescriptor {
    pub fn new(url: impl Into<String>, auto_kill_notification_on_destroy: bool) -> Self {
        Self {
            url: url.into(),
            auto_kill_notification_on_destroy,
        }
    }
}

/// Playback session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    StoppedFocusTransient,
    StoppedFocusLoss,
    Stopped,
    Error,
}

impl PlaybackState {
    /// States from which `play` starts a fresh load
    pub fn is_startable(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Stopped | Self::Error | Self::StoppedFocusLoss
        )
    }

    /// States that may still hold a live player instance
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Playing | Self::StoppedFocusTransient
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::StoppedFocusTransient => "stopped (transient focus loss)",
            Self::StoppedFocusLoss => "stopped (focus loss)",
            Self::Stopped => "stopped",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
