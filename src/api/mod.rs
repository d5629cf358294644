//! # Document API
//!
//! One blocking `POST` of a JSON document to the upload endpoint, and the
//! rules that decide whether the server accepted it.
//!
//! The request body is
//!
//! ```json
//! {"fileName": "invoice.pdf", "documentType": "MISC", "fileContent": "<base64>", "note": "..."}
//! ```
//!
//! and an accepted upload answers HTTP 200 with
//! `{"success": true, "documentUid": "..."}`. Anything else is a failure.
//! There is no retry.

mod client;

use std::fs;
use std::io;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use client::HttpClient;

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("HTTP request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Server answered HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Server response is not JSON")]
    NotJson { body: String },

    #[error("No success reported")]
    NotSuccessful { body: String },

    #[error("No documentUid reported")]
    MissingDocumentUid { body: String },
}

impl ApiError {
    /// Returns the raw response body, if the server answered at all
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Transport { .. } => None,
            ApiError::Status { body, .. }
            | ApiError::NotJson { body }
            | ApiError::NotSuccessful { body }
            | ApiError::MissingDocumentUid { body } => Some(body),
        }
    }
}

/// Upload request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    pub document_type: String,

    /// Base64 encoded file content
    pub file_content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl UploadRequest {
    /// Builds a request from file bytes
    pub fn new(file_name: impl Into<String>, document_type: impl Into<String>, content: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            document_type: document_type.into(),
            file_content: STANDARD.encode(content),
            note: None,
        }
    }

    /// Reads and encodes a file; the file handle is closed on return
    pub fn from_file(path: &Path, document_type: &str) -> io::Result<Self> {
        let content = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, document_type, &content))
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.is_empty());
        self
    }
}

/// HTTP status and body as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

/// A document the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub document_uid: String,
    pub body: String,
}

/// Remote document store
#[cfg_attr(test, mockall::automock)]
pub trait DocumentApi {
    /// Sends one upload request; errors only on transport failures
    fn upload(&self, request: &UploadRequest) -> Result<ApiReply, ApiError>;

    fn endpoint(&self) -> String;
}

/// Decides whether a reply means the document was accepted
pub fn evaluate(reply: ApiReply) -> Result<Accepted, ApiError> {
    let ApiReply { status, body } = reply;

    if status != 200 {
        return Err(ApiError::Status { status, body });
    }

    let json: Value = match serde_json::from_str(&body) {
        Ok(json) => json,
        Err(_) => return Err(ApiError::NotJson { body }),
    };

    if json.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(ApiError::NotSuccessful { body });
    }

    let document_uid = match json.get("documentUid") {
        Some(Value::String(uid)) if !uid.is_empty() => uid.clone(),
        Some(Value::Number(uid)) => uid.to_string(),
        _ => return Err(ApiError::MissingDocumentUid { body }),
    };

    Ok(Accepted { document_uid, body })
}
