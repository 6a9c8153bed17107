//! Error types for the provider diagnostics crate

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Version string could not be parsed
    Version(semver::Error),

    /// System clipboard unavailable or rejected the text
    Clipboard(arboard::Error),

    /// Configuration error
    Config(String),

    /// Request exceeded the probe timeout
    Timeout,

    /// Request could not be constructed at all
    InvalidRequest(String),

    /// Remote version manifest was unusable
    Manifest(String),

    /// Issue report failed validation or export
    Report(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Version(err) => write!(f, "Version error: {}", err),
            MonitorError::Clipboard(err) => write!(f, "Clipboard error: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::Timeout => write!(f, "Connection timeout"),
            MonitorError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            MonitorError::Manifest(msg) => write!(f, "Manifest error: {}", msg),
            MonitorError::Report(msg) => write!(f, "Report error: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            MonitorError::Version(err) => Some(err),
            MonitorError::Clipboard(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

impl From<semver::Error> for MonitorError {
    fn from(err: semver::Error) -> Self {
        MonitorError::Version(err)
    }
}

impl From<arboard::Error> for MonitorError {
    fn from(err: arboard::Error) -> Self {
        MonitorError::Clipboard(err)
    }
}
