//! gmi-upload - idempotent document uploads to the GetMyInvoices API
//!
//! Each file carries its upload state (`uploading`, `done`, `failed`) in
//! extended attributes or sidecar files, so the tool can be run repeatedly
//! from cron or a folder watcher without duplicate or lost uploads.

pub mod api;
pub mod cli;
pub mod domain;
pub mod guard;
pub mod output;
pub mod storage;
pub mod upload;

pub use domain::{UploadRecord, UploadStatus};
pub use storage::{StateStore, StoreError};
pub use upload::{Outcome, UploadError, Uploader};
