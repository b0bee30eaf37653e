pub mod orchestrator;
pub mod remote;

use crate::source::{FilePosition, LogRole, ReaderError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use orchestrator::{Ingestor, ResolvedSource};
pub use remote::{RemoteClient, RemoteClientError};

/// One poll: which role, where the client left off, and whether rotated
/// archives should be included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogRequest {
    pub role: LogRole,
    pub positions: Vec<FilePosition>,
    pub include_archived: bool,
}

/// Raw lines plus the positions to send back on the next poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub positions: Vec<FilePosition>,
    /// Set when the batch cannot be resumed (archives, plaintext remotes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileFailure>,
}

impl LogBatch {
    pub fn new(logs: Vec<String>, positions: Vec<FilePosition>) -> Self {
        Self {
            logs,
            positions,
            complete: None,
            errors: Vec::new(),
        }
    }

    pub fn completed(mut self) -> Self {
        self.complete = Some(true);
        self
    }
}

/// A file of a directory scan that could not be read this poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Io(String),

    #[error("remote returned status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("remote request timed out after {0:?}")]
    RemoteTimeout(Duration),

    #[error("remote request failed: {0}")]
    RemoteTransport(String),
}

impl IngestError {
    /// HTTP status to answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::NotFound(_) => 404,
            IngestError::Remote { status, .. } => *status,
            IngestError::Io(_) | IngestError::RemoteTimeout(_) | IngestError::RemoteTransport(_) => 500,
        }
    }
}

impl From<ReaderError> for IngestError {
    fn from(e: ReaderError) -> Self {
        match e {
            ReaderError::NotFound(ref path) => {
                IngestError::NotFound(format!("log file not found: {}", path.display()))
            }
            other => IngestError::Io(other.to_string()),
        }
    }
}

impl From<RemoteClientError> for IngestError {
    fn from(e: RemoteClientError) -> Self {
        match e {
            RemoteClientError::Status { status, message } => IngestError::Remote { status, message },
            RemoteClientError::Timeout(after) => IngestError::RemoteTimeout(after),
            other => IngestError::RemoteTransport(other.to_string()),
        }
    }
}
