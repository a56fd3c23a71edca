//! ffmpeg-backed encoder
//!
//! Frames are handed to ffmpeg through a concat-demuxer list so the exact
//! order chosen by the generator is preserved, independent of ffmpeg's own
//! glob expansion.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::Encoder;
use crate::config::EncoderSettings;
use crate::error::{Result, TimelapseError};

/// Lines of ffmpeg stderr kept in error messages
const STDERR_TAIL_LINES: usize = 10;

/// How often a bounded encode checks whether ffmpeg has exited
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Encoder that runs the ffmpeg CLI
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    settings: EncoderSettings,
}

impl FfmpegEncoder {
    /// Create an encoder from settings
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// The settings in use
    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Check if the configured ffmpeg binary runs
    pub fn available(&self) -> bool {
        Command::new(&self.settings.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Build the concat-demuxer list for `frames` shown for `1/fps` seconds each
    pub fn concat_list(frames: &[PathBuf], fps: u32) -> Result<String> {
        let last = frames
            .last()
            .ok_or_else(|| TimelapseError::encoder("No frames to encode"))?;

        let duration = 1.0 / f64::from(fps.max(1));
        let mut list = String::from("ffconcat version 1.0\n");

        for frame in frames {
            list.push_str(&format!("file {}\n", quote_path(frame)?));
            list.push_str(&format!("duration {:.6}\n", duration));
        }
        // The concat demuxer ignores the final entry's duration unless the
        // file is listed once more
        list.push_str(&format!("file {}\n", quote_path(last)?));

        Ok(list)
    }

    /// Arguments for one encode, given the concat list path
    pub fn build_args(&self, list: &Path, fps: u32, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list.display().to_string(),
            "-r".to_string(),
            fps.to_string(),
            "-c:v".to_string(),
            self.settings.codec.clone(),
            "-pix_fmt".to_string(),
            self.settings.pixel_format.clone(),
            "-f".to_string(),
            "mp4".to_string(),
            output.display().to_string(),
        ]
    }

    /// Wait for ffmpeg, killing it if the configured timeout elapses
    fn wait(&self, child: &mut std::process::Child) -> Result<ExitStatus> {
        if self.settings.timeout_secs == 0 {
            return Ok(child.wait()?);
        }

        let deadline = Instant::now() + Duration::from_secs(self.settings.timeout_secs);
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    "ffmpeg exceeded {}s, killing pid {}",
                    self.settings.timeout_secs,
                    child.id()
                );
                if let Err(e) = child.kill() {
                    warn!("Failed to kill ffmpeg: {}", e);
                }
                let _ = child.wait();
                return Err(TimelapseError::encoder(format!(
                    "ffmpeg timed out after {}s",
                    self.settings.timeout_secs
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<()> {
        if fps == 0 {
            return Err(TimelapseError::encoder("Frame rate must be positive"));
        }

        let list = Self::concat_list(frames, fps)?;

        let mut list_file = tempfile::Builder::new()
            .prefix("timelapse-")
            .suffix(".ffconcat")
            .tempfile()?;
        list_file.write_all(list.as_bytes())?;
        list_file.flush()?;

        let args = self.build_args(list_file.path(), fps, output);
        debug!("Running {:?} {}", self.settings.ffmpeg, args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(&self.settings.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TimelapseError::encoder(format!(
                    "Failed to spawn {:?}: {}",
                    self.settings.ffmpeg, e
                ))
            })?;

        // Drain stderr on its own thread so a chatty ffmpeg never blocks on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = self.wait(&mut child);
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let status = status?;

        if !status.success() {
            return Err(TimelapseError::encoder(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr_tail(&stderr)
            )));
        }

        info!(
            "Encoded {} frames at {} fps into {:?} in {:.1}s",
            frames.len(),
            fps,
            output,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Quote a path for an ffconcat `file` directive, made absolute first
/// because ffmpeg resolves relative entries against the list's directory
fn quote_path(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    let text = absolute.to_str().ok_or_else(|| {
        TimelapseError::encoder(format!("Frame path is not valid UTF-8: {:?}", path))
    })?;
    Ok(format!("'{}'", text.replace('\'', r"'\''")))
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_repeats_last_frame() {
        let frames = vec![PathBuf::from("/f/0001.jpg"), PathBuf::from("/f/0002.jpg")];
        let list = FfmpegEncoder::concat_list(&frames, 10).unwrap();
        let lines: Vec<&str> = list.lines().collect();

        assert_eq!(
            lines,
            [
                "ffconcat version 1.0",
                "file '/f/0001.jpg'",
                "duration 0.100000",
                "file '/f/0002.jpg'",
                "duration 0.100000",
                "file '/f/0002.jpg'",
            ]
        );
    }

    #[test]
    fn test_concat_list_quotes_and_absolutizes() {
        let frames = vec![PathBuf::from("it's/0001.jpg")];
        let list = FfmpegEncoder::concat_list(&frames, 1).unwrap();
        assert!(list.contains(r"it'\''s/0001.jpg'"));
        assert!(list.contains("file '/"));
    }

    #[test]
    fn test_concat_list_requires_frames() {
        assert!(FfmpegEncoder::concat_list(&[], 10).is_err());
    }

    #[test]
    fn test_build_args() {
        let encoder = FfmpegEncoder::default();
        let args = encoder.build_args(Path::new("/tmp/list"), 30, Path::new("/out/a_temp_30_fps.mp4"));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-i") + 1], "/tmp/list");
        assert_eq!(args[pos("-r") + 1], "30");
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-pix_fmt") + 1], "yuv420p");
        assert_eq!(args.last().map(String::as_str), Some("/out/a_temp_30_fps.mp4"));
        assert_eq!(args[0], "-y");
    }

    #[test]
    fn test_missing_binary_is_an_encoder_error() {
        let encoder = FfmpegEncoder::new(EncoderSettings {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg-binary"),
            ..EncoderSettings::default()
        });
        assert!(!encoder.available());

        let dir = tempfile::tempdir().unwrap();
        let frames = vec![dir.path().join("0001.jpg")];
        let err = encoder
            .encode(&frames, 10, &dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, TimelapseError::Encoder(_)));
    }

    #[test]
    fn test_stderr_tail() {
        let stderr = (1..=20).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(&stderr);
        assert!(tail.starts_with("line 11"));
        assert!(tail.ends_with("line 20"));
    }
}
