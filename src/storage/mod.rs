//! # Storage Layer
//!
//! Persistence of per-file upload state through a side channel attached to
//! the filesystem entry. The file content itself is never touched.
//!
//! ## Backends
//!
//! | Backend | Format | Payload |
//! |---------|--------|---------|
//! | [`XattrStore`] | `user.<namespace>.upload-status`, `user.<namespace>.document-uid` | document UID |
//! | [`SidecarStore`] | `<file>.uploading`, `<file>.done`, `<file>.failed` | raw API response |
//!
//! Both implement [`StateStore`] and are picked at configuration time via
//! [`Backend`].
//!
//! ## Concurrency
//!
//! There is no compare-and-set. The `uploading` marker acts as an advisory
//! lock between invocations; two runs that both observe "no marker" race.

mod attr;
mod config;
mod sidecar;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{UploadRecord, UploadStatus};

pub use attr::XattrStore;
pub use config::{Config, ConfigError, DEFAULT_DOCTYPE, DEFAULT_ENDPOINT, DEFAULT_NAMESPACE};
pub use sidecar::SidecarStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Upload state I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Upload state of {path} did not read back: expected {expected}, found {found}")]
    Verification {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Unrecognised upload status '{value}' on {path}")]
    Corrupt { path: PathBuf, value: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a store keeps as the record payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStyle {
    /// The full response body of the API call
    RawResponse,

    /// Only the document UID assigned by the server
    DocumentUid,
}

/// Persistence backend for upload records
pub trait StateStore {
    /// Reads the record of a file; `None` means the file was never marked
    fn get(&self, file: &Path) -> Result<Option<UploadRecord>, StoreError>;

    /// Writes a record, replacing whatever marker the backend held before
    fn set(
        &self,
        file: &Path,
        status: UploadStatus,
        payload: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Removes one marker; removing an absent marker succeeds
    fn clear(&self, file: &Path, status: UploadStatus) -> Result<(), StoreError>;

    /// Removes every marker the backend knows about
    fn clear_all(&self, file: &Path) -> Result<(), StoreError>;

    fn payload_style(&self) -> PayloadStyle;

    /// Short backend name for diagnostics
    fn describe(&self) -> String;

    /// Writes a record and reads it back
    ///
    /// Guards against filesystems that accept a write and silently drop it.
    fn set_verified(
        &self,
        file: &Path,
        status: UploadStatus,
        payload: Option<&str>,
    ) -> Result<(), StoreError> {
        self.set(file, status, payload)?;

        // Stores read an empty payload back as none
        let payload = payload.filter(|p| !p.is_empty());
        let expected = UploadRecord::new(status, payload.map(str::to_string));
        match self.get(file)? {
            Some(found) if found == expected => Ok(()),
            found => Err(StoreError::Verification {
                path: file.to_path_buf(),
                expected: expected.to_string(),
                found: found.map(|r| r.to_string()).unwrap_or_else(|| "nothing".to_string()),
            }),
        }
    }
}

/// Available persistence backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Extended attributes on the file itself
    #[default]
    Xattr,

    /// `<file>.<status>` marker files next to it
    Sidecar,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Xattr => "xattr",
            Backend::Sidecar => "sidecar",
        }
    }

    /// Builds the configured store
    pub fn open(&self, namespace: &str) -> Box<dyn StateStore> {
        match self {
            Backend::Xattr => Box::new(XattrStore::new(namespace)),
            Backend::Sidecar => Box::new(SidecarStore::new()),
        }
    }
}

/// Fails with [`StoreError::NotFound`] unless the target is an existing file
pub(crate) fn require_file(file: &Path) -> Result<(), StoreError> {
    match std::fs::metadata(file) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(StoreError::NotFound(file.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(file.to_path_buf())),
        Err(e) => Err(StoreError::io(file, e)),
    }
}
