//! Integration tests for the ffmpeg encoder, driven by stand-in shell scripts
#![cfg(unix)]

mod mocks;

use mocks::write_frames;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use timelapse_core::config::EncoderSettings;
use timelapse_core::encode::{Encoder, FfmpegEncoder};
use timelapse_core::error::TimelapseError;

/// Writing an executable while another test forks can fail with ETXTBSY
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn encoder(ffmpeg: PathBuf, timeout_secs: u64) -> FfmpegEncoder {
    FfmpegEncoder::new(EncoderSettings {
        ffmpeg,
        timeout_secs,
        ..EncoderSettings::default()
    })
}

#[test]
fn test_successful_encode_writes_output() {
    let _lock = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(&dir.path().join("frames"), 3, "f");

    // Keep a copy of the concat list and the argument vector next to the output
    let ffmpeg = fake_ffmpeg(
        dir.path(),
        r#"for last; do :; done
out_dir=$(dirname "$last")
cp "${10}" "$out_dir/list.ffconcat"
echo "$@" > "$out_dir/args.txt"
printf 'fake video' > "$last""#,
    );
    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let output = out_dir.join("yard_temp_10_fps.mp4");

    let encoder = encoder(ffmpeg, 0);
    assert!(encoder.available());
    encoder.encode(&frames, 10, &output).unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), b"fake video");

    let list = std::fs::read_to_string(out_dir.join("list.ffconcat")).unwrap();
    assert!(list.starts_with("ffconcat version 1.0\n"));
    let files: Vec<&str> = list.lines().filter(|l| l.starts_with("file ")).collect();
    assert_eq!(files.len(), 4);
    assert!(files[0].ends_with("0001.jpg'"));
    assert!(files[2].ends_with("0003.jpg'"));
    assert_eq!(files[2], files[3]);

    let args = std::fs::read_to_string(out_dir.join("args.txt")).unwrap();
    assert!(args.contains("-f concat -safe 0"));
    assert!(args.contains("-r 10 -c:v libx264 -pix_fmt yuv420p"));
}

#[test]
fn test_failed_encode_reports_stderr() {
    let _lock = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(&dir.path().join("frames"), 1, "f");
    let ffmpeg = fake_ffmpeg(dir.path(), "echo 'Unknown encoder libx264' >&2\nexit 1");

    let err = encoder(ffmpeg, 0)
        .encode(&frames, 10, &dir.path().join("out.mp4"))
        .unwrap_err();

    assert!(matches!(err, TimelapseError::Encoder(_)));
    assert!(err.to_string().contains("Unknown encoder libx264"));
    assert!(err.user_hint().is_some());
}

#[test]
fn test_encode_timeout_kills_ffmpeg() {
    let _lock = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(&dir.path().join("frames"), 1, "f");
    let ffmpeg = fake_ffmpeg(dir.path(), "exec sleep 30");

    let started = Instant::now();
    let err = encoder(ffmpeg, 1)
        .encode(&frames, 10, &dir.path().join("out.mp4"))
        .unwrap_err();

    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_zero_fps_rejected_before_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(&dir.path().join("frames"), 1, "f");
    let err = encoder(PathBuf::from("/nonexistent/ffmpeg"), 0)
        .encode(&frames, 0, &dir.path().join("out.mp4"))
        .unwrap_err();
    assert!(err.to_string().contains("Frame rate"));
}
