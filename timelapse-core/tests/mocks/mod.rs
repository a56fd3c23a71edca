//! Mock infrastructure for testing
//!
//! Provides an in-process encoder and helpers for laying out frame
//! directories.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use timelapse_core::encode::Encoder;
use timelapse_core::error::{Result, TimelapseError};

/// One recorded encoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCall {
    pub frames: Vec<PathBuf>,
    pub fps: u32,
    pub output: PathBuf,
}

/// Encoder that concatenates frame bytes behind a small header
///
/// The output is written in two halves with `delay` in between, so a
/// partially written file exists for a while during every encode.
#[derive(Debug, Default)]
pub struct MockEncoder {
    calls: Mutex<Vec<EncodeCall>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
    fail_on: Option<String>,
}

impl MockEncoder {
    /// Create an encoder that succeeds immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between writing the two halves of each video
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail (after writing half a file) when the output filename contains `fragment`
    pub fn failing_on(mut self, fragment: impl Into<String>) -> Self {
        self.fail_on = Some(fragment.into());
        self
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of encodes that ever ran at the same time
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// The bytes this encoder produces for a frame set
    pub fn expected_output(frames: &[PathBuf], fps: u32) -> Vec<u8> {
        let mut out = format!("MOCKVIDEO fps={} frames={}\n", fps, frames.len()).into_bytes();
        for frame in frames {
            out.extend(std::fs::read(frame).unwrap_or_default());
        }
        out
    }

    fn write_output(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()> {
        let data = Self::expected_output(frames, fps);
        let (head, tail) = data.split_at(data.len() / 2);

        let mut file = std::fs::File::create(output)?;
        file.write_all(head)?;
        file.flush()?;

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if let Some(fragment) = &self.fail_on {
            let name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.contains(fragment.as_str()) {
                return Err(TimelapseError::encoder(format!("mock failure for {}", name)));
            }
        }

        file.write_all(tail)?;
        file.sync_all()?;
        Ok(())
    }
}

impl Encoder for MockEncoder {
    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        self.calls.lock().unwrap().push(EncodeCall {
            frames: frames.to_vec(),
            fps,
            output: output.to_path_buf(),
        });

        let result = self.write_output(frames, fps, output);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Write `count` frames named `0001.jpg`.. into `dir`, each holding `<tag>-<n>`
pub fn write_frames(dir: &Path, count: usize, tag: &str) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    (1..=count)
        .map(|i| {
            let path = dir.join(format!("{:04}.jpg", i));
            std::fs::write(&path, format!("{}-{:04};", tag, i)).unwrap();
            path
        })
        .collect()
}

/// Glob matching every `.jpg` in `dir`
pub fn jpg_pattern(dir: &Path) -> String {
    format!("{}/*.jpg", dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_frames_sorted_names() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), 3, "x");
        assert_eq!(frames.len(), 3);
        assert!(frames[0].ends_with("0001.jpg"));
        assert_eq!(std::fs::read_to_string(&frames[2]).unwrap(), "x-0003;");
    }

    #[test]
    fn test_mock_encoder_output() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(&dir.path().join("f"), 2, "a");
        let out = dir.path().join("out.mp4");

        let encoder = MockEncoder::new();
        encoder.encode(&frames, 5, &out).unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), MockEncoder::expected_output(&frames, 5));
        assert_eq!(encoder.call_count(), 1);
        assert_eq!(encoder.max_active(), 1);
    }

    #[test]
    fn test_mock_encoder_failure_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(&dir.path().join("f"), 4, "a");
        let out = dir.path().join("bad_temp_5_fps.mp4");

        let encoder = MockEncoder::new().failing_on("bad");
        assert!(encoder.encode(&frames, 5, &out).is_err());

        let written = std::fs::read(&out).unwrap();
        assert!(written.len() < MockEncoder::expected_output(&frames, 5).len());
    }
}
