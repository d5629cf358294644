//! Domain models for gmi-upload
//!
//! Contains the upload record and the decision table without any I/O concerns.

mod machine;
mod record;

pub use machine::{decide, Decision, UploadFlags};
pub use record::{StatusError, UploadRecord, UploadStatus};
