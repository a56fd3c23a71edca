//! Video encoding
//!
//! The generator only needs one capability: turn an ordered list of still
//! frames into a playable video at a given frame rate. [`Encoder`] is that
//! seam; [`FfmpegEncoder`] implements it by shelling out to ffmpeg.

mod ffmpeg;

pub use ffmpeg::FfmpegEncoder;

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Turns still frames into a video file
///
/// Implementations block until the video is complete. `Ok(())` means a
/// complete, playable file exists at `output`. A failed or interrupted
/// encode may leave a partial file at `output`; callers never pass the
/// published path here.
pub trait Encoder: Send + Sync {
    /// Encode `frames`, in order, at `fps` frames per second into `output`
    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &str {
        "encoder"
    }
}
