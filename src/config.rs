//! Observer configuration.
//!
//! Everything needed to reach an instance is passed in explicitly. A JSON
//! file may set any subset of fields; the rest take their defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::protocol::{ScreenSize, StateLayout};

/// Connection target and protocol settings for one observer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// `host:port` of the instance.
    pub target: String,
    /// Path of the state telemetry channel.
    pub state_path: String,
    /// Path of the display telemetry channel.
    pub display_path: String,
    /// State frame layout the instance writes.
    pub layout: StateLayout,
    /// Screen size assumed when state frames do not carry one.
    pub screen: ScreenSize,
    /// Connect/read/write timeout for commands, in milliseconds. Must be
    /// non-zero.
    pub command_timeout_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            target: "localhost:9999".to_string(),
            state_path: "/debugger".to_string(),
            display_path: "/display".to_string(),
            layout: StateLayout::Canonical,
            screen: ScreenSize::SMALL,
            command_timeout_ms: 2000,
        }
    }
}

impl ObserverConfig {
    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Parse a JSON configuration. A zero screen side fails while parsing.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ObserverConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid("command_timeout_ms must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// WebSocket URL of the state channel.
    pub fn state_url(&self) -> String {
        format!("ws://{}{}", self.target, self.state_path)
    }

    /// WebSocket URL of the display channel.
    pub fn display_url(&self) -> String {
        format!("ws://{}{}", self.target, self.display_path)
    }
}

/// Errors from loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
