//! Upload state machine
//!
//! Drives one file through `new → uploading → {done, failed}`:
//!
//! 1. read the record and [`decide`] what to do
//! 2. refuse files another process holds open
//! 3. write `uploading` and read it back
//! 4. send the file once and evaluate the reply
//! 5. replace `uploading` by `done` or `failed`
//!
//! A run makes at most one upload attempt. A crashed run leaves the
//! `uploading` marker behind, which blocks further runs until `--resume`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::api::{evaluate, Accepted, ApiError, DocumentApi, UploadRequest};
use crate::domain::{decide, Decision, UploadFlags, UploadStatus};
use crate::guard::{GuardError, LivenessGuard};
use crate::output::{error_chain, Output};
use crate::storage::{PayloadStyle, StateStore, StoreError};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("File is open in another process: {0}")]
    FileLocked(PathBuf),

    #[error("Aborted upload detected for: {0} (maybe retry using --resume)")]
    DanglingUpload(PathBuf),

    #[error(transparent)]
    State(StoreError),

    #[error("Open-file check failed")]
    Guard(#[from] GuardError),

    #[error("Cannot read {file}")]
    Read {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Upload failed for {file}")]
    Upload {
        file: PathBuf,
        #[source]
        source: ApiError,
    },
}

impl From<StoreError> for UploadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => UploadError::FileNotFound(path),
            other => UploadError::State(other),
        }
    }
}

impl UploadError {
    /// Raw server response carried by a rejected upload
    pub fn response_body(&self) -> Option<&str> {
        match self {
            UploadError::Upload { source, .. } => source.body(),
            _ => None,
        }
    }
}

/// One file to upload and how
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub file: PathBuf,
    pub doctype: String,
    pub note: Option<String>,
    pub flags: UploadFlags,
}

/// Successful end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server accepted the document
    Uploaded { document_uid: String },

    /// The file was already marked `done`; nothing was sent
    AlreadyDone,
}

/// Wires the store, the guard and the API together
pub struct Uploader<'a> {
    store: &'a dyn StateStore,
    guard: &'a dyn LivenessGuard,
    api: &'a dyn DocumentApi,
    output: &'a Output,
}

impl<'a> Uploader<'a> {
    pub fn new(
        store: &'a dyn StateStore,
        guard: &'a dyn LivenessGuard,
        api: &'a dyn DocumentApi,
        output: &'a Output,
    ) -> Self {
        Self {
            store,
            guard,
            api,
            output,
        }
    }

    /// Runs the state machine for one file
    pub fn run(&self, job: &UploadJob) -> Result<Outcome, UploadError> {
        let file = job.file.as_path();
        let out = self.output;

        out.verbose_ctx("state", &format!("Reading upload state of {} from {}", file.display(), self.store.describe()));
        let record = self.store.get(file)?;
        let decision = decide(record.as_ref(), job.flags);
        out.verbose_ctx(
            "state",
            &format!(
                "Current state: {}, decision: {}",
                record.as_ref().map(|r| r.status).unwrap_or_default(),
                decision.label()
            ),
        );

        match decision {
            Decision::Skip => {
                out.info(&format!("File already marked as uploaded: {}", file.display()));
                return Ok(Outcome::AlreadyDone);
            }
            Decision::AbortDangling => return Err(UploadError::DanglingUpload(file.to_path_buf())),
            Decision::Resume => out.info(&format!("Will resume aborted upload for: {}", file.display())),
            Decision::Reupload => out.info(&format!("Will upload again: {}", file.display())),
            Decision::Retry => out.info(&format!("Will retry failed upload for: {}", file.display())),
            Decision::Proceed => out.verbose_ctx("state", "No upload state set. Will proceed with upload."),
        }

        out.verbose_ctx("guard", &format!("Checking for other processes using {} via {}", file.display(), self.guard.describe()));
        if self.guard.is_open_elsewhere(file)? {
            return Err(UploadError::FileLocked(file.to_path_buf()));
        }

        if decision.clears_prior() {
            out.verbose_ctx("state", "Clearing previous upload state");
            self.store.clear_all(file)?;
        }

        out.verbose_ctx("state", &format!("Setting status \"{}\" and reading it back", UploadStatus::Uploading));
        self.store.set_verified(file, UploadStatus::Uploading, None)?;

        match self.attempt(job) {
            Ok(accepted) => self.mark_done(file, accepted),
            Err(failure) => {
                self.mark_failed(file, &failure)?;
                Err(failure)
            }
        }
    }

    /// Reads the file and sends it; exactly one request
    fn attempt(&self, job: &UploadJob) -> Result<Accepted, UploadError> {
        let file = job.file.as_path();

        let request = UploadRequest::from_file(file, &job.doctype)
            .map_err(|source| UploadError::Read {
                file: file.to_path_buf(),
                source,
            })?
            .with_note(job.note.clone());

        self.output.verbose_ctx(
            "api",
            &format!(
                "POST {} (fileName={}, documentType={}, {} base64 bytes)",
                self.api.endpoint(),
                request.file_name,
                request.document_type,
                request.file_content.len()
            ),
        );

        self.api
            .upload(&request)
            .and_then(|reply| {
                self.output.verbose_ctx("api", &format!("HTTP status {}", reply.status));
                evaluate(reply)
            })
            .map_err(|source| UploadError::Upload {
                file: file.to_path_buf(),
                source,
            })
    }

    fn mark_done(&self, file: &Path, accepted: Accepted) -> Result<Outcome, UploadError> {
        let payload = match self.store.payload_style() {
            PayloadStyle::RawResponse => accepted.body.as_str(),
            PayloadStyle::DocumentUid => accepted.document_uid.as_str(),
        };

        // `set` replaces the `uploading` marker; it stays if the write fails
        self.output.verbose_ctx("state", &format!("Setting status \"{}\"", UploadStatus::Done));
        self.store.set_verified(file, UploadStatus::Done, Some(payload))?;

        self.output.info(&format!(
            "Upload succeeded: {} (documentUid {})",
            file.display(),
            accepted.document_uid
        ));

        Ok(Outcome::Uploaded {
            document_uid: accepted.document_uid,
        })
    }

    fn mark_failed(&self, file: &Path, failure: &UploadError) -> Result<(), UploadError> {
        let payload = match self.store.payload_style() {
            PayloadStyle::RawResponse => failure.response_body(),
            PayloadStyle::DocumentUid => None,
        };

        self.output.verbose_ctx("state", &format!("Setting status \"{}\"", UploadStatus::Failed));
        if let Err(e) = self.store.set_verified(file, UploadStatus::Failed, payload) {
            // Report the upload failure before the state error replaces it
            self.output.error(&error_chain(failure));
            return Err(e.into());
        }
        Ok(())
    }
}
