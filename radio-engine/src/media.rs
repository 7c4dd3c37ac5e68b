//! Media Engine seam
//!
//! The engine never decodes audio itself. It sequences calls into a
//! `MediaPlayer` created by a `MediaEngine`, and reacts to the callbacks the
//! player reports through its `PlayerEventSink`.

use std::sync::mpsc;
use std::time::Duration;

use crate::error::MediaError;
use crate::machine::EngineInput;
use crate::types::AudioUsage;

/// Player error code for a buffer that fell behind the live window
pub const BEHIND_LIVE_WINDOW_CODE: i32 = 1002;

/// Everything a player needs to be built for one stream
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub uri: String,
    pub usage: AudioUsage,
    /// Target distance from the live edge
    pub live_target_offset: Duration,
    /// Upper bound for catch-up playback speed
    pub max_playback_speed: f32,
}

/// Factory for player instances
pub trait MediaEngine: Send + Sync {
    /// Build a player that reports its callbacks into `events`
    fn create_player(
        &self,
        config: PlayerConfig,
        events: PlayerEventSink,
    ) -> Result<Box<dyn MediaPlayer>, MediaError>;
}

/// A single player instance
///
/// Calls are only ever issued from the engine thread.
pub trait MediaPlayer: Send {
    fn prepare(&mut self, uri: &str);
    fn set_play_when_ready(&mut self, play: bool);
    fn set_volume(&mut self, volume: f32);
    fn stop(&mut self);
    fn release(&mut self);
    fn seek_to_live_edge(&mut self);
    /// Re-route output without recreating the player
    fn set_audio_usage(&mut self, usage: AudioUsage);
    /// Stream length, `None` while unknown or for live streams
    fn duration(&self) -> Option<Duration>;
}

/// Classification of a player error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorCode {
    /// Recoverable: reseek to the live edge and prepare again
    BehindLiveWindow,
    /// Any other code is fatal for the player instance
    Other(i32),
}

impl MediaErrorCode {
    pub fn from_code(code: i32) -> Self {
        if code == BEHIND_LIVE_WINDOW_CODE {
            Self::BehindLiveWindow
        } else {
            Self::Other(code)
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::BehindLiveWindow => BEHIND_LIVE_WINDOW_CODE,
            Self::Other(code) => code,
        }
    }
}

/// Callback reported by a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    Idle,
    Error { code: MediaErrorCode, message: String },
}

/// Channel a player reports its callbacks through
///
/// Each sink is stamped with the generation of the player it was created
/// for, so callbacks from a released player are discarded.
#[derive(Debug, Clone)]
pub struct PlayerEventSink {
    generation: u64,
    tx: mpsc::Sender<EngineInput>,
}

impl PlayerEventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::Sender<EngineInput>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the player this sink belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ready(&self) {
        self.send(PlayerEvent::Ready);
    }

    pub fn idle(&self) {
        self.send(PlayerEvent::Idle);
    }

    pub fn error(&self, code: MediaErrorCode, message: impl Into<String>) {
        self.send(PlayerEvent::Error {
            code,
            message: message.into(),
        });
    }

    /// Report a callback
    pub fn send(&self, event: PlayerEvent) {
        let input = EngineInput::Player {
            generation: self.generation,
            event,
        };
        if self.tx.send(input).is_err() {
            tracing::trace!(
                "Engine gone, dropping player callback for generation {}",
                self.generation
            );
        }
    }
}
