//! Extended-attribute storage for upload records
//!
//! Keys are compatible with earlier deployments:
//! - `user.<namespace>.upload-status` holds `uploading`, `done` or `failed`
//! - `user.<namespace>.document-uid` holds the document UID once known

use std::path::Path;

use super::{require_file, PayloadStyle, StateStore, StoreError};
use crate::domain::{UploadRecord, UploadStatus};

/// Store keeping the record in the file's user extended attributes
#[derive(Debug, Clone)]
pub struct XattrStore {
    status_key: String,
    document_uid_key: String,
}

impl XattrStore {
    /// Creates a store for the given namespace, e.g. `de.scsy.putmybills`
    pub fn new(namespace: &str) -> Self {
        let namespace = namespace.trim_matches('.');
        Self {
            status_key: format!("user.{}.upload-status", namespace),
            document_uid_key: format!("user.{}.document-uid", namespace),
        }
    }

    pub fn status_key(&self) -> &str {
        &self.status_key
    }

    pub fn document_uid_key(&self) -> &str {
        &self.document_uid_key
    }

    fn read(&self, file: &Path, key: &str) -> Result<Option<String>, StoreError> {
        let value = xattr::get(file, key).map_err(|e| StoreError::io(file, e))?;
        Ok(value
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .filter(|s| !s.is_empty()))
    }

    fn remove(&self, file: &Path, key: &str) -> Result<(), StoreError> {
        // Removing a missing attribute is an error on most platforms
        if xattr::get(file, key)
            .map_err(|e| StoreError::io(file, e))?
            .is_none()
        {
            return Ok(());
        }
        xattr::remove(file, key).map_err(|e| StoreError::io(file, e))
    }
}

impl StateStore for XattrStore {
    fn get(&self, file: &Path) -> Result<Option<UploadRecord>, StoreError> {
        require_file(file)?;

        let Some(raw) = self.read(file, &self.status_key)? else {
            return Ok(None);
        };

        let status = raw.parse::<UploadStatus>().map_err(|_| StoreError::Corrupt {
            path: file.to_path_buf(),
            value: raw.clone(),
        })?;

        if status == UploadStatus::New {
            return Ok(None);
        }

        let payload = self.read(file, &self.document_uid_key)?;
        Ok(Some(UploadRecord::new(status, payload)))
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

        // Status last: a record never claims `done` without its UID
        match payload.filter(|p| !p.is_empty()) {
            Some(uid) => xattr::set(file, &self.document_uid_key, uid.as_bytes())
                .map_err(|e| StoreError::io(file, e))?,
            None => self.remove(file, &self.document_uid_key)?,
        }

        xattr::set(file, &self.status_key, status.as_str().as_bytes())
            .map_err(|e| StoreError::io(file, e))
    }

    fn clear(&self, file: &Path, status: UploadStatus) -> Result<(), StoreError> {
        require_file(file)?;

        // One status attribute: only drop it when it holds this status
        let current = self.read(file, &self.status_key)?;
        if current.as_deref() == Some(status.as_str()) {
            self.remove(file, &self.status_key)?;
            self.remove(file, &self.document_uid_key)?;
        }
        Ok(())
    }

    fn clear_all(&self, file: &Path) -> Result<(), StoreError> {
        require_file(file)?;
        self.remove(file, &self.status_key)?;
        self.remove(file, &self.document_uid_key)
    }

    fn payload_style(&self) -> PayloadStyle {
        PayloadStyle::DocumentUid
    }

    fn describe(&self) -> String {
        format!("extended attributes ({})", self.status_key)
    }
}
