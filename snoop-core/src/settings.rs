//! Session settings
//!
//! `Settings` is the plain configuration record a capture session consumes.
//! It can be built in code, from command-line flags, or loaded from a JSON
//! document using the camelCase field names (`protocols`, `save`,
//! `durationMillis`, `promiscuous`, ...).

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default snapshot length (maximum bytes per packet)
pub const DEFAULT_SNAPLEN: i32 = 65535;

/// Default read timeout in milliseconds; bounds how long a worker can miss a stop request
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Low-level options for each capture handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout of the handle in milliseconds
    pub poll_interval_ms: u64,
    /// Deliver packets as soon as they arrive
    pub immediate_mode: bool,
    /// Kernel buffer size (0 = platform default)
    pub buffer_size: i32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            immediate_mode: true,
            buffer_size: 0,
        }
    }
}

impl CaptureConfig {
    /// Read timeout as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Settings for one capture session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Protocols to capture; empty means everything
    #[serde(deserialize_with = "protocols_from_keyword_or_list")]
    pub protocols: Vec<String>,
    /// Persist records to a session log file
    pub save: bool,
    /// Session duration in milliseconds (0 = until stopped)
    pub duration_millis: u64,
    /// Open handles in promiscuous mode
    pub promiscuous: bool,
    /// Restrict capture to these interface names (empty = all)
    pub interfaces: Vec<String>,
    /// Directory receiving the session log file
    pub output_dir: PathBuf,
    /// Handle options
    pub capture: CaptureConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protocols: Vec::new(),
            save: false,
            duration_millis: 0,
            promiscuous: false,
            interfaces: Vec::new(),
            output_dir: PathBuf::from("."),
            capture: CaptureConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Session deadline, if one was configured
    pub fn duration(&self) -> Option<Duration> {
        match self.duration_millis {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Check values the capture transport would otherwise reject per interface
    pub fn validate(&self) -> Result<()> {
        if self.capture.snaplen <= 0 {
            return Err(Error::config(format!(
                "snaplen must be positive, got {}",
                self.capture.snaplen
            )));
        }
        if self.capture.poll_interval_ms == 0 {
            return Err(Error::config("pollIntervalMs must be at least 1"));
        }
        if self.capture.buffer_size < 0 {
            return Err(Error::config(format!(
                "bufferSize must not be negative, got {}",
                self.capture.buffer_size
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProtocolsInput {
    Keyword(String),
    List(Vec<String>),
}

fn protocols_from_keyword_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ProtocolsInput::deserialize(deserializer)? {
        ProtocolsInput::Keyword(keyword) if keyword.trim().is_empty() => Vec::new(),
        ProtocolsInput::Keyword(keyword) => vec![keyword],
        ProtocolsInput::List(list) => list,
    })
}
