//! Error taxonomy for the recording bridge
//!
//! - `UsageError`: caller misuse, rejected before any device interaction
//! - `DeviceError`: camera/microphone or recorder failures, reported through
//!   the session's error handler
//! - `TransportError`: malformed or misordered transport payloads
//! - `PersistenceError`: artifact store failures, propagated to the caller

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("on_data_available is required to start recording")]
    MissingDataHandler,

    #[error("no capture handle mounted for key {0}")]
    UnknownHandle(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported MIME type: {0}")]
    UnsupportedMimeType(String),

    #[error("no media stream available")]
    StreamUnavailable,

    #[error("recorder error: {0}")]
    Recorder(String),

    #[error("frame capture failed: {0}")]
    Frame(String),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("payload is not a data URI")]
    NotDataUri,

    #[error("data URI has no data section")]
    MissingData,

    #[error("invalid base64 body: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("chunk {got} arrived out of order (expected {expected})")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("{count} consecutive chunks failed to decode")]
    RepeatedFailures { count: usize },
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact key: {0:?}")]
    InvalidKey(String),

    #[error("artifact {0} is not recording")]
    NotRecording(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Umbrella error for operations that cross more than one layer
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error shape handed to `on_error` handlers and screenshot handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<&DeviceError> for ErrorInfo {
    fn from(error: &DeviceError) -> Self {
        let kind = match error {
            DeviceError::PermissionDenied(_) => "PERMISSION_DENIED",
            DeviceError::UnsupportedMimeType(_) => "UNSUPPORTED_MIME_TYPE",
            DeviceError::StreamUnavailable => "STREAM_UNAVAILABLE",
            DeviceError::Recorder(_) => "RECORDER_ERROR",
            DeviceError::Frame(_) => "FRAME_ERROR",
        };
        Self::new(kind, error.to_string())
    }
}

impl From<&BridgeError> for ErrorInfo {
    fn from(error: &BridgeError) -> Self {
        match error {
            BridgeError::Device(e) => e.into(),
            BridgeError::Usage(_) => Self::new("USAGE_ERROR", error.to_string()),
            BridgeError::Transport(_) => Self::new("TRANSPORT_ERROR", error.to_string()),
            BridgeError::Persistence(_) => Self::new("PERSISTENCE_ERROR", error.to_string()),
        }
    }
}
