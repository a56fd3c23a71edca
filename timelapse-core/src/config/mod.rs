//! Configuration types for timelapse
//!
//! Capture groups describe where frames come from and where videos go.
//! Server and encoder settings tune the scheduler, HTTP listener and ffmpeg.

mod file;

pub use file::{sample_config, ConfigFile};

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::catalog::is_valid_filename;
use crate::error::{Result, TimelapseError};

/// Suffix shared by every published video
pub const VIDEO_EXTENSION: &str = "mp4";

/// One named source pattern plus the videos generated from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureGroup {
    /// Unique identifier, used to derive output filenames
    pub name: String,

    /// Display label for the listing page
    #[serde(default)]
    pub title: String,

    /// Glob selecting the source frames, e.g. `./frames/yard/*.jpg`
    #[serde(alias = "framePattern")]
    pub pattern: String,

    /// One video is produced per frame rate, in this order
    #[serde(alias = "frameRates")]
    pub fps: Vec<u32>,

    /// Directory where published videos live
    #[serde(alias = "outputDirectory", alias = "save_path")]
    pub save_path: PathBuf,
}

impl CaptureGroup {
    /// Create a group with a single frame rate
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        fps: u32,
        save_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            pattern: pattern.into(),
            fps: vec![fps],
            save_path: save_path.into(),
        }
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Replace the frame rates
    pub fn with_fps(mut self, fps: impl Into<Vec<u32>>) -> Self {
        self.fps = fps.into();
        self
    }

    /// Title to show to humans, falling back to the name
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.name
        } else {
            &self.title
        }
    }

    /// Published filename for one frame rate: `<name>_<fps>_fps.mp4`
    pub fn video_name(&self, fps: u32) -> String {
        format!("{}_{}_fps.{}", self.name, fps, VIDEO_EXTENSION)
    }

    /// Filename the encoder writes to before publishing: `<name>_temp_<fps>_fps.mp4`
    pub fn temp_video_name(&self, fps: u32) -> String {
        format!("{}_temp_{}_fps.{}", self.name, fps, VIDEO_EXTENSION)
    }

    /// Full path of the published video for one frame rate
    pub fn video_path(&self, fps: u32) -> PathBuf {
        self.save_path.join(self.video_name(fps))
    }

    /// Full path of the in-progress video for one frame rate
    pub fn temp_video_path(&self, fps: u32) -> PathBuf {
        self.save_path.join(self.temp_video_name(fps))
    }

    /// Check the group on its own; cross-group checks happen in the catalog
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TimelapseError::config("Capture group name must not be empty"));
        }
        // Derived names have to survive the stream handler's filename check
        if !is_valid_filename(&self.name) {
            return Err(TimelapseError::config(format!(
                "Capture group name '{}' may only contain letters, digits, '_', '-' and '.'",
                self.name
            )));
        }
        if self.pattern.trim().is_empty() {
            return Err(TimelapseError::config(format!(
                "Capture group '{}' has an empty frame pattern",
                self.name
            )));
        }
        if self.fps.is_empty() {
            return Err(TimelapseError::config(format!(
                "Capture group '{}' needs at least one frame rate",
                self.name
            )));
        }
        if self.fps.contains(&0) {
            return Err(TimelapseError::config(format!(
                "Capture group '{}' has a frame rate of 0",
                self.name
            )));
        }
        if self.save_path.as_os_str().is_empty() {
            return Err(TimelapseError::config(format!(
                "Capture group '{}' has an empty save path",
                self.name
            )));
        }
        Ok(())
    }
}

/// What a generation trigger does when a previous pass still holds the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Block until the running pass finishes, then run
    #[default]
    Wait,
    /// Drop the trigger
    Skip,
}

impl std::fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wait => write!(f, "wait"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wait" | "block" => Ok(Self::Wait),
            "skip" | "drop" => Ok(Self::Skip),
            _ => Err(format!("Unknown overlap policy: {}", s)),
        }
    }
}

/// HTTP listener and scheduling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Cron expression with a leading seconds field
    #[serde(default = "default_cron_spec")]
    pub cron_spec: String,

    /// Behavior when triggers overlap
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cron_spec: default_cron_spec(),
            overlap: OverlapPolicy::default(),
        }
    }
}

/// ffmpeg invocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// ffmpeg binary, looked up on PATH unless absolute
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Video codec passed to `-c:v`
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Pixel format passed to `-pix_fmt`
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Kill an encode that runs longer than this (0 = no limit)
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            codec: default_codec(),
            pixel_format: default_pixel_format(),
            timeout_secs: 0,
        }
    }
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Every minute, on the minute
pub fn default_cron_spec() -> String {
    "0 */1 * * * *".to_string()
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_codec() -> String {
    "libx264".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}
