//! Timelapse generation
//!
//! For one capture group: expand the frame pattern, encode one video per
//! frame rate into a temporary file next to the published one, then
//! publish it with a single rename. Readers of the published name see the
//! previous video or the new one, never a partial file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::CaptureGroup;
use crate::encode::Encoder;
use crate::error::{Result, ResultExt, TimelapseError};

/// What happened to one frame rate of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Encoded and renamed into place
    Published(PathBuf),
    /// The encoder failed; nothing was published
    EncodeFailed(String),
    /// Encoded, but the rename failed; the temp file is left for inspection
    PublishFailed { temp: PathBuf, reason: String },
}

impl RenderOutcome {
    /// True if the video was published
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Outcome for one frame rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub fps: u32,
    pub outcome: RenderOutcome,
}

/// Outcome of generating one capture group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    /// Group name
    pub group: String,
    /// Number of frames matched by the pattern
    pub frames: usize,
    /// One entry per frame rate attempted, in configured order
    pub renders: Vec<RenderReport>,
}

impl GroupReport {
    /// True if the group had no frames and nothing was attempted
    pub fn is_skipped(&self) -> bool {
        self.frames == 0
    }

    /// Number of frame rates that were published
    pub fn published(&self) -> usize {
        self.renders
            .iter()
            .filter(|r| r.outcome.is_published())
            .count()
    }

    /// Number of frame rates that failed to encode or publish
    pub fn failed(&self) -> usize {
        self.renders.len() - self.published()
    }
}

/// Expand a glob into frame paths in lexical order
///
/// Frame filenames must sort lexically in capture order (zero-padded
/// counters or timestamps); no numeric-aware sorting is attempted.
pub fn find_frames(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();

    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => frames.push(path),
            Ok(path) => debug!("Ignoring non-file match {:?}", path),
            Err(e) => warn!("Unreadable path while matching {}: {}", pattern, e),
        }
    }

    frames.sort();
    Ok(frames)
}

/// Move a finished video into place with one rename
pub fn publish(temp: &Path, target: &Path) -> Result<()> {
    std::fs::rename(temp, target).map_err(|e| {
        TimelapseError::publish(format!("Failed to rename {:?} to {:?}: {}", temp, target, e))
    })
}

/// Runs the encoder for capture groups and publishes the results
#[derive(Clone)]
pub struct Generator {
    encoder: Arc<dyn Encoder>,
}

impl Generator {
    /// Create a generator around an encoder
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self { encoder }
    }

    /// Generate every frame rate of one group
    ///
    /// Blocks for as long as the encoder runs. Failures are reported in the
    /// returned [`GroupReport`] and never stop the remaining frame rates.
    pub fn generate(&self, group: &CaptureGroup) -> GroupReport {
        info!("Generating videos for '{}'", group.name);

        let frames = match find_frames(&group.pattern)
            .context(format!("Finding frames for '{}' with {}", group.name, group.pattern))
        {
            Ok(frames) => frames,
            Err(e) => {
                error!("{}", e);
                Vec::new()
            }
        };

        if frames.is_empty() {
            info!("No frames found for pattern: {}", group.pattern);
            return GroupReport {
                group: group.name.clone(),
                frames: 0,
                renders: Vec::new(),
            };
        }

        debug!(
            "'{}': {} frames, first {:?}, last {:?}",
            group.name,
            frames.len(),
            frames.first(),
            frames.last()
        );

        let renders = group
            .fps
            .iter()
            .map(|&fps| RenderReport {
                fps,
                outcome: self.render(group, &frames, fps),
            })
            .collect();

        GroupReport {
            group: group.name.clone(),
            frames: frames.len(),
            renders,
        }
    }

    /// Encode and publish one frame rate
    fn render(&self, group: &CaptureGroup, frames: &[PathBuf], fps: u32) -> RenderOutcome {
        let temp = group.temp_video_path(fps);
        let target = group.video_path(fps);
        let started = Instant::now();

        if let Err(e) = self.encoder.encode(frames, fps, &temp) {
            error!(
                "Failed to create video {:?} with {}: {}",
                target,
                self.encoder.name(),
                e
            );
            return RenderOutcome::EncodeFailed(e.to_string());
        }

        if let Err(e) = publish(&temp, &target) {
            error!("{}", e);
            return RenderOutcome::PublishFailed {
                temp,
                reason: e.to_string(),
            };
        }

        info!(
            "Published {:?} ({} frames @ {} fps, {:.1}s)",
            target,
            frames.len(),
            fps,
            started.elapsed().as_secs_f64()
        );
        RenderOutcome::Published(target)
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("encoder", &self.encoder.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_frames_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0003.jpg", "0001.jpg", "0002.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("0000.jpg")).unwrap();

        let pattern = format!("{}/*.jpg", dir.path().display());
        let frames = find_frames(&pattern).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["0001.jpg", "0002.jpg", "0003.jpg"]);
    }

    #[test]
    fn test_find_frames_bad_pattern() {
        assert!(find_frames("frames/[*.jpg").is_err());
    }

    #[test]
    fn test_find_frames_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.png", dir.path().display());
        assert!(find_frames(&pattern).unwrap().is_empty());
    }

    #[test]
    fn test_publish_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("a_temp_1_fps.mp4");
        let target = dir.path().join("a_1_fps.mp4");
        std::fs::write(&temp, b"new").unwrap();
        std::fs::write(&target, b"old").unwrap();

        publish(&temp, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        assert!(!temp.exists());
    }

    #[test]
    fn test_group_report_counts() {
        let report = GroupReport {
            group: "yard".to_string(),
            frames: 3,
            renders: vec![
                RenderReport {
                    fps: 10,
                    outcome: RenderOutcome::Published(PathBuf::from("/out/yard_10_fps.mp4")),
                },
                RenderReport {
                    fps: 30,
                    outcome: RenderOutcome::EncodeFailed("boom".to_string()),
                },
            ],
        };
        assert!(!report.is_skipped());
        assert_eq!(report.published(), 1);
        assert_eq!(report.failed(), 1);
    }
}
