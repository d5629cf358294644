//! Upload record model
//!
//! A target file owns zero or one [`UploadRecord`]. The record lives beside
//! the file (extended attribute or sidecar file), never inside its content.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StatusError {
    #[error("Unknown upload status '{0}': expected one of new, uploading, done, failed")]
    Unknown(String),
}

/// Upload status of a target file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UploadStatus {
    /// No marker present
    #[default]
    New,

    /// An upload was started and has not been settled
    Uploading,

    /// The server accepted the document
    Done,

    /// The last attempt was rejected or never reached the server
    Failed,
}

impl UploadStatus {
    /// Returns the tag used in persisted markers
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::New => "new",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Done => "done",
            UploadStatus::Failed => "failed",
        }
    }

    /// Statuses that are written as markers, in read precedence order
    pub fn persisted() -> &'static [UploadStatus] {
        &[
            UploadStatus::Uploading,
            UploadStatus::Done,
            UploadStatus::Failed,
        ]
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "new" => Ok(UploadStatus::New),
            "uploading" => Ok(UploadStatus::Uploading),
            "done" => Ok(UploadStatus::Done),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(StatusError::Unknown(other.to_string())),
        }
    }
}

/// Persisted upload state of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub status: UploadStatus,

    /// Raw server response or document UID, depending on the store
    pub payload: Option<String>,
}

impl UploadRecord {
    pub fn new(status: UploadStatus, payload: Option<String>) -> Self {
        Self { status, payload }
    }

    /// Creates a record without payload
    pub fn bare(status: UploadStatus) -> Self {
        Self::new(status, None)
    }
}

impl fmt::Display for UploadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(payload) => write!(f, "{} ({})", self.status, payload),
            None => write!(f, "{}", self.status),
        }
    }
}
