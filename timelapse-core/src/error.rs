//! Error types for timelapse

use thiserror::Error;

/// Result type alias using TimelapseError
pub type Result<T> = std::result::Result<T, TimelapseError>;

/// Main error type for timelapse operations
#[derive(Debug, Error)]
pub enum TimelapseError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encoder error
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Publishing an encoded video under its final name failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Two capture groups derive the same video filename
    #[error("Duplicate video name: {0}")]
    DuplicateVideo(String),

    /// Invalid cron expression
    #[error("Invalid schedule: {0}")]
    Schedule(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TimelapseError>,
    },
}

impl TimelapseError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an encoder error
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Create a publish error
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Create a server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// A short hint telling the user how to fix the problem, if we know one
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check the capture groups in your config file (see `timelapse config sample`)"),
            Self::Encoder(_) => Some("Make sure ffmpeg is installed and the configured codec is available"),
            Self::Publish(_) => Some("The output directory must be writable and hold both the temporary and published video"),
            Self::DuplicateVideo(_) => Some("Give every capture group a unique name"),
            Self::Schedule(_) => Some("Cron expressions need six fields, starting with seconds: \"0 */1 * * * *\""),
            Self::Server(_) => Some("Is another process already listening on this port?"),
            Self::Io(_) => None,
            Self::WithContext { source, .. } => source.user_hint(),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<glob::PatternError> for TimelapseError {
    fn from(err: glob::PatternError) -> Self {
        Self::Config(format!("Invalid frame pattern: {}", err))
    }
}

impl From<cron::error::Error> for TimelapseError {
    fn from(err: cron::error::Error) -> Self {
        Self::Schedule(err.to_string())
    }
}
