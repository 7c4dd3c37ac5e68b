//! Configuration for the session broker

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use radio_engine::EngineConfig;

use crate::error::{Result, SessionError};

/// File name looked up by `SessionConfig::load_default`
pub const CONFIG_FILE_NAME: &str = "radio-session.json";

/// Configuration for a `SessionBroker`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Engine tuning and notification channel
    pub engine: EngineConfig,

    /// Allow `initialize` to replace the descriptor while disconnected
    /// Default: true
    pub allow_reinitialize: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            allow_reinitialize: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset that rejects a second `initialize` until a disconnect
    pub fn strict() -> Self {
        Self {
            allow_reinitialize: false,
            ..Self::default()
        }
    }

    /// Parse a JSON document, missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SessionError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded session config from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Default config location under the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("radio-session").join(CONFIG_FILE_NAME))
    }

    /// Load from `default_path()`, falling back to defaults when absent
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .map_err(|e| SessionError::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.allow_reinitialize);
        assert!(config.validate().is_ok());
        assert!(!SessionConfig::strict().allow_reinitialize);
    }

    #[test]
    fn test_from_json_str() {
        let config =
            SessionConfig::from_json_str(r#"{"allow_reinitialize":false,"engine":{"duck_volume":0.1}}"#)
                .unwrap();
        assert!(!config.allow_reinitialize);
        assert_eq!(config.engine.duck_volume, 0.1);
        assert_eq!(config.engine.full_volume, 1.0);
    }

    #[test]
    fn test_from_json_str_rejects_invalid_values() {
        let result = SessionConfig::from_json_str(r#"{"engine":{"full_volume":3.0}}"#);
        assert!(matches!(result, Err(SessionError::Configuration(_))));

        let result = SessionConfig::from_json_str("not json");
        assert!(matches!(result, Err(SessionError::ConfigParse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"allow_reinitialize":false}}"#).unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert!(!config.allow_reinitialize);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::load("/nonexistent/radio-session.json");
        assert!(matches!(result, Err(SessionError::ConfigIo { .. })));
    }
}
