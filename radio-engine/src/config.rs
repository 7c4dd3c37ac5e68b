//! Configuration for the playback engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EngineError;
use crate::notification::ChannelConfig;
use crate::power::DEFAULT_WAKE_LOCK_TAG;

/// Configuration for a `PlaybackEngine`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Volume used while playing normally
    /// Default: 1.0
    pub full_volume: f32,

    /// Volume used while another app holds duckable focus
    /// Default: 0.2
    pub duck_volume: f32,

    /// Target distance from the live edge, in milliseconds
    /// Default: 5000
    pub live_target_offset_ms: u64,

    /// Upper bound for catch-up playback speed
    /// Default: 1.02
    pub max_playback_speed: f32,

    /// Foreground notification channel
    pub notification: ChannelConfig,

    /// Tag of the wake lock held while attached
    /// Default: "BackgroundMode"
    pub wake_lock_tag: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            full_volume: 1.0,
            duck_volume: 0.2,
            live_target_offset_ms: 5000,
            max_playback_speed: 1.02,
            notification: ChannelConfig::default(),
            wake_lock_tag: DEFAULT_WAKE_LOCK_TAG.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn live_target_offset(&self) -> Duration {
        Duration::from_millis(self.live_target_offset_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.full_volume) {
            return Err(EngineError::Configuration(
                "Full volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.duck_volume) {
            return Err(EngineError::Configuration(
                "Duck volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.duck_volume > self.full_volume {
            return Err(EngineError::Configuration(
                "Duck volume must not exceed full volume".to_string(),
            ));
        }

        if self.max_playback_speed.is_nan() || self.max_playback_speed < 1.0 {
            return Err(EngineError::Configuration(
                "Max playback speed must be at least 1.0".to_string(),
            ));
        }

        if self.notification.channel_id.is_empty() {
            return Err(EngineError::Configuration(
                "Notification channel id must not be empty".to_string(),
            ));
        }

        if self.wake_lock_tag.is_empty() {
            return Err(EngineError::Configuration(
                "Wake lock tag must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.live_target_offset(), Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.duck_volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.full_volume = 0.1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.max_playback_speed = 0.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.max_playback_speed = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.notification.channel_id.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.wake_lock_tag.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"duck_volume":0.3}"#).unwrap();
        assert_eq!(config.duck_volume, 0.3);
        assert_eq!(config.full_volume, 1.0);
        assert_eq!(config.live_target_offset_ms, 5000);
        assert_eq!(config.wake_lock_tag, "BackgroundMode");
    }
}
