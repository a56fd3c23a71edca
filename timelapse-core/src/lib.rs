//! Timelapse Core Library
//!
//! Periodically turns directories of still frames into timelapse videos and
//! serves them over HTTP with byte-range support.
//!
//! This library provides:
//! - Frame discovery by glob pattern and ffmpeg encoding
//! - Atomic publishing of finished videos
//! - A scheduler that serializes generation passes
//! - An axum server for seekable range-request playback
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Scheduler       │───▶│ Generator    │───▶│ Encoder      │───▶│ rename into  │
//! │ (startup, cron) │    │ (glob)       │    │ (ffmpeg)     │    │ place        │
//! └─────────────────┘    └──────────────┘    └──────────────┘    └──────┬───────┘
//!                                                                       │
//!                        ┌──────────────┐    ┌──────────────┐           │
//!           HTTP ───────▶│ Catalog      │───▶│ Range stream │◀──────────┘
//!                        └──────────────┘    └──────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod encode;
pub mod error;
pub mod generate;
pub mod scheduler;
pub mod server;

pub use catalog::{Catalog, CatalogEntry};
pub use config::{CaptureGroup, ConfigFile, OverlapPolicy};
pub use encode::{Encoder, FfmpegEncoder};
pub use error::{Result, TimelapseError};
pub use generate::{GroupReport, Generator, RenderOutcome};
pub use scheduler::{GenerationGate, PassReport, Scheduler};
