//! Error types for Jellybridge Core

use thiserror::Error;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tracker error types
#[derive(Error, Debug)]
pub enum Error {
    // Host errors
    #[error("No file is currently playing")]
    NotPlaying,

    // Remote server errors
    #[error("Remote call {call} returned HTTP {status}")]
    HttpStatus { call: &'static str, status: u16 },

    #[error("Unknown server: {0}")]
    UnknownServer(String),

    // Session errors
    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // EDL errors
    #[error("Invalid EDL line {line}: {reason}")]
    InvalidEdlLine { line: usize, reason: String },

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotPlaying
                | Error::HttpStatus { .. }
                | Error::Network(_)
                | Error::InvalidEdlLine { .. }
        )
    }

    /// Returns the error code for log correlation
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotPlaying => "NOT_PLAYING",
            Error::HttpStatus { .. } => "HTTP_STATUS",
            Error::UnknownServer(_) => "UNKNOWN_SERVER",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::InvalidEdlLine { .. } => "INVALID_EDL",
            Error::Network(_) => "NETWORK",
            Error::Url(_) => "URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}
