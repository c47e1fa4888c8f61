//! Behaviour toggles read from a `key = value` file.
//!
//! Offsets never live here; every connection rediscovers them.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::layout::target::PROCESS_NAME;
use crate::process::AccessMode;

/// Polling cadence defaults.
pub mod timing {
    /// Snapshot refresh interval while connected.
    pub const POLL_INTERVAL_MS: u64 = 100;

    /// Delay between attach attempts while disconnected.
    pub const RECONNECT_INTERVAL_MS: u64 = 1000;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub process_name: String,
    /// Reject every remote write.
    pub read_only: bool,
    pub poll_interval_ms: u64,
    pub reconnect_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: PROCESS_NAME.to_string(),
            read_only: false,
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            reconnect_interval_ms: timing::RECONNECT_INTERVAL_MS,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.format())?;
        Ok(())
    }

    /// Parse `key = value` lines over the defaults.
    ///
    /// `#` and `;` start comment lines. Unknown keys are logged and skipped;
    /// malformed values of known keys are errors.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::ConfigParseError(format!(
                    "line {}: expected key = value, got '{}'",
                    number + 1,
                    line
                )));
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "process_name" => {
                    if value.is_empty() {
                        return Err(Error::ConfigParseError(format!(
                            "line {}: process_name is empty",
                            number + 1
                        )));
                    }
                    config.process_name = value.to_string();
                }
                "read_only" => config.read_only = parse_bool(&key, value)?,
                "poll_interval_ms" => config.poll_interval_ms = parse_millis(&key, value)?,
                "reconnect_interval_ms" => {
                    config.reconnect_interval_ms = parse_millis(&key, value)?
                }
                _ => {
                    warn!("Unknown config key: '{}' (value: {})", key, value);
                }
            }
        }

        Ok(config)
    }

    pub fn format(&self) -> String {
        let lines = [
            format!("process_name = {}", self.process_name),
            format!("read_only = {}", self.read_only),
            format!("poll_interval_ms = {}", self.poll_interval_ms),
            format!("reconnect_interval_ms = {}", self.reconnect_interval_ms),
        ];
        lines.join("\n")
    }

    pub fn access(&self) -> AccessMode {
        if self.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::ConfigParseError(format!(
            "{}: expected a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(0) => Err(Error::ConfigParseError(format!("{}: must be positive", key))),
        Ok(ms) => Ok(ms),
        Err(e) => Err(Error::ConfigParseError(format!(
            "{}: failed to parse '{}': {}",
            key, value, e
        ))),
    }
}
