//! `GET /stream/:filename`
//!
//! Request flow: validate the filename, look it up in the catalog, open
//! and stat the file, resolve the byte range, then stream exactly that
//! window with a 206. Every response that carries video is a 206, even
//! when the window covers the whole file.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use std::io::SeekFrom;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use super::range::ByteRange;
use super::AppState;
use crate::catalog::{is_valid_filename, Catalog};

/// Read size for streamed bodies
const CHUNK_SIZE: usize = 64 * 1024;

/// Why a stream request was refused
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Video not in catalog: {0}")]
    UnknownVideo(String),

    #[error("Video file not found: {0}")]
    MissingFile(String),

    #[error("Failed to stat {0}: {1}")]
    FileInfo(String, std::io::Error),

    #[error("Invalid byte range for {filename}: {range:?}")]
    InvalidRange {
        filename: String,
        range: Option<String>,
    },

    #[error("Failed to seek {0}: {1}")]
    Seek(String, std::io::Error),
}

impl StreamError {
    /// Status code sent to the client
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            Self::UnknownVideo(_) | Self::MissingFile(_) => StatusCode::NOT_FOUND,
            Self::InvalidRange { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::FileInfo(..) | Self::Seek(..) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent to the client
    fn message(&self) -> &'static str {
        match self {
            Self::InvalidFilename(_) => "Invalid filename.",
            Self::UnknownVideo(_) | Self::MissingFile(_) => "Video not found.",
            Self::FileInfo(..) => "Failed to get file info.",
            Self::InvalidRange { .. } => "Invalid byte range.",
            Self::Seek(..) => "Failed to stream video.",
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Stream error: {}", self);
        } else {
            warn!("Stream error: {}", self);
        }
        (status, self.message()).into_response()
    }
}

/// Axum handler for `GET /stream/:filename`
pub async fn stream_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StreamError> {
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    open_video(&state.catalog, &filename, range).await
}

/// Everything after routing; split out so it can be driven directly
pub async fn open_video(
    catalog: &Catalog,
    filename: &str,
    range_header: Option<&str>,
) -> Result<Response, StreamError> {
    // Checked before anything touches the filesystem
    if !is_valid_filename(filename) {
        return Err(StreamError::InvalidFilename(filename.to_string()));
    }

    let entry = catalog
        .get(filename)
        .ok_or_else(|| StreamError::UnknownVideo(filename.to_string()))?;
    let path = entry.path();

    let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
        debug!("Open {:?} failed: {}", path, e);
        StreamError::MissingFile(filename.to_string())
    })?;

    let size = file
        .metadata()
        .await
        .map_err(|e| StreamError::FileInfo(filename.to_string(), e))?
        .len();

    let range = ByteRange::resolve(range_header, size).map_err(|_| StreamError::InvalidRange {
        filename: filename.to_string(),
        range: range_header.map(str::to_string),
    })?;

    debug!(
        filename,
        range = ?range_header,
        size,
        start = range.start,
        end = range.end,
        "Streaming video"
    );

    file.seek(SeekFrom::Start(range.start))
        .await
        .map_err(|e| StreamError::Seek(filename.to_string(), e))?;

    // Status and headers are committed once the body starts; a failed read
    // can only be logged and ends the body early
    let name = filename.to_string();
    let body = ReaderStream::with_capacity(file.take(range.len()), CHUNK_SIZE)
        .inspect_err(move |e| error!("Failed to stream {}: {}", name, e));

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_RANGE, range.content_range()),
            (header::CONTENT_LENGTH, range.len().to_string()),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
