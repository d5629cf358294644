//! Sidecar-file storage for upload records
//!
//! The record of `invoice.pdf` is a marker file next to it:
//! `invoice.pdf.uploading`, `invoice.pdf.done` or `invoice.pdf.failed`.
//! The marker content is the raw API response, or empty.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{require_file, PayloadStyle, StateStore, StoreError};
use crate::domain::{UploadRecord, UploadStatus};

/// Store keeping one marker file per target file
#[derive(Debug, Default, Clone)]
pub struct SidecarStore;

impl SidecarStore {
    pub fn new() -> Self {
        Self
    }

    /// Returns the marker path for a status, e.g. `invoice.pdf.done`
    pub fn marker_path(file: &Path, status: UploadStatus) -> PathBuf {
        let mut name = OsString::from(file.as_os_str());
        name.push(".");
        name.push(status.as_str());
        PathBuf::from(name)
    }

    fn temp_path(marker: &Path) -> PathBuf {
        let mut name = OsString::from(marker.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn remove_if_present(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn remove_marker(file: &Path, status: UploadStatus) -> Result<(), StoreError> {
        Self::remove_if_present(&Self::marker_path(file, status))
    }

    fn write_marker(marker: &Path, content: &str) -> Result<(), StoreError> {
        let temp_path = Self::temp_path(marker);

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StoreError::io(&temp_path, e))?;

            file.lock_exclusive()
                .map_err(|e| StoreError::io(&temp_path, e))?;

            let mut writer = BufWriter::new(&file);
            writer
                .write_all(content.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| StoreError::io(&temp_path, e))?;
        }

        // Atomic rename
        fs::rename(&temp_path, marker).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::io(marker, e)
        })
    }
}

impl StateStore for SidecarStore {
    fn get(&self, file: &Path) -> Result<Option<UploadRecord>, StoreError> {
        require_file(file)?;

        // Several markers only exist after an interrupted write;
        // the first hit in precedence order wins.
        for &status in UploadStatus::persisted() {
            let marker = Self::marker_path(file, status);
            match fs::read_to_string(&marker) {
                Ok(content) => {
                    let payload = (!content.is_empty()).then_some(content);
                    return Ok(Some(UploadRecord::new(status, payload)));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(&marker, e)),
            }
        }

        Ok(None)
    }

    fn set(
        &self,
        file: &Path,
        status: UploadStatus,
        payload: Option<&str>,
    ) -> Result<(), StoreError> {
        require_file(file)?;

        if status == UploadStatus::New {
            return self.clear_all(file);
        }

        Self::write_marker(&Self::marker_path(file, status), payload.unwrap_or(""))?;

        // At most one marker per file; the new one exists before the old go
        for &other in UploadStatus::persisted() {
            if other != status {
                Self::remove_marker(file, other)?;
            }
        }
        Ok(())
    }

    fn clear(&self, file: &Path, status: UploadStatus) -> Result<(), StoreError> {
        require_file(file)?;
        if status == UploadStatus::New {
            return Ok(());
        }
        Self::remove_marker(file, status)
    }

    fn clear_all(&self, file: &Path) -> Result<(), StoreError> {
        require_file(file)?;
        for &status in UploadStatus::persisted() {
            let marker = Self::marker_path(file, status);
            Self::remove_if_present(&marker)?;
            // Left behind by a write interrupted before its rename
            Self::remove_if_present(&Self::temp_path(&marker))?;
        }
        Ok(())
    }

    fn payload_style(&self) -> PayloadStyle {
        PayloadStyle::RawResponse
    }

    fn describe(&self) -> String {
        "sidecar files".to_string()
    }
}
