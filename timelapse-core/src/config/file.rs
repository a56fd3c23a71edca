//! Configuration file loading
//!
//! Accepts either a JSON array of capture groups (the long-standing
//! `data/config.json` layout) or a full document in JSON or TOML with
//! `server`, `encoder` and `groups` sections.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::{CaptureGroup, EncoderSettings, ServerSettings};
use crate::error::{Result, TimelapseError};
use crate::scheduler::parse_schedule;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Listener and scheduling settings
    #[serde(default)]
    pub server: ServerSettings,

    /// ffmpeg settings
    #[serde(default)]
    pub encoder: EncoderSettings,

    /// Capture groups, processed in this order
    #[serde(default)]
    pub groups: Vec<CaptureGroup>,
}

impl ConfigFile {
    /// Load and validate configuration from a file
    ///
    /// The format is picked from the extension: `.toml` is TOML, anything
    /// else is JSON.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            TimelapseError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml(&content)?
        } else {
            Self::from_json(&content)?
        };

        config.validate()?;

        info!(
            "Loaded configuration from {:?} ({} capture groups)",
            path,
            config.groups.len()
        );
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TimelapseError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Parse a JSON document, either a bare array of groups or a full object
    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| TimelapseError::config(format!("Failed to parse config file: {}", e)))?;

        if value.is_array() {
            debug!("Config is a bare capture group list");
            let groups: Vec<CaptureGroup> = serde_json::from_value(value).map_err(|e| {
                TimelapseError::config(format!("Failed to parse capture groups: {}", e))
            })?;
            Ok(Self {
                groups,
                ..Self::default()
            })
        } else {
            serde_json::from_value(value)
                .map_err(|e| TimelapseError::config(format!("Failed to parse config file: {}", e)))
        }
    }

    /// Validate every group plus the schedule
    ///
    /// Duplicate derived video names are rejected later, when the catalog is built.
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(TimelapseError::config("No capture groups configured"));
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            group.validate()?;
            if !names.insert(group.name.as_str()) {
                return Err(TimelapseError::config(format!(
                    "Capture group '{}' is defined more than once",
                    group.name
                )));
            }
        }

        parse_schedule(&self.server.cron_spec)?;

        if self.encoder.codec.trim().is_empty() {
            return Err(TimelapseError::config("Encoder codec must not be empty"));
        }

        Ok(())
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Timelapse Configuration

[server]
# Address and port for the HTTP server
bind = "0.0.0.0"
port = 8080

# Cron expression with a leading seconds field: sec min hour day month weekday
cron_spec = "0 */1 * * * *"

# What a trigger does while a previous generation pass is still running:
#   "wait" - queue behind it, then run
#   "skip" - drop the trigger
overlap = "wait"

[encoder]
# ffmpeg binary (looked up on PATH unless absolute)
ffmpeg = "ffmpeg"

# Video codec and pixel format
codec = "libx264"
pixel_format = "yuv420p"

# Kill an encode that runs longer than this many seconds (0 = no limit)
timeout_secs = 0

# One block per capture group. Frame filenames must sort lexically in
# capture order (zero-padded counters or timestamps).
[[groups]]
name = "yard"
title = "Back Yard"
pattern = "./frames/yard/*.jpg"
fps = [10, 30]
save_path = "./out"
"#
    .to_string()
}
