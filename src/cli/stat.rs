//! `gmi-stat`: show the recorded upload state of files

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use crate::domain::UploadRecord;
use crate::output::{error_chain, Output, OutputFormat};
use crate::storage::{Backend, Config, StateStore, StoreError, DEFAULT_NAMESPACE};

#[derive(Parser, Debug)]
#[command(name = "gmi-stat")]
#[command(version, about = "Show the upload state of files")]
pub struct StatCli {
    /// Files to inspect
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Config file [default: ~/.config/gmi-upload/config.toml]
    #[arg(long, env = "GMI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where upload state is kept [default: xattr]
    #[arg(long, env = "GMI_BACKEND", value_enum)]
    pub backend: Option<Backend>,

    /// Extended-attribute namespace [default: de.scsy.putmybills]
    #[arg(long, env = "GMI_NAMESPACE")]
    pub namespace: Option<String>,

    /// Show verbose progress
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// State of one file as listed by `gmi-stat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRow {
    pub file: String,
    pub status: String,
    #[serde(rename = "documentUid")]
    pub document_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatRow {
    fn from_record(file: String, record: Option<UploadRecord>) -> Self {
        match record {
            None => Self {
                file,
                status: "-".to_string(),
                document_uid: None,
                error: None,
            },
            Some(record) => Self {
                file,
                status: record.status.to_string(),
                document_uid: record.payload.as_deref().and_then(document_uid),
                error: None,
            },
        }
    }

    fn from_error(file: String, err: &StoreError) -> Self {
        let status = match err {
            StoreError::NotFound(_) => "missing",
            _ => "error",
        };
        Self {
            file,
            status: status.to_string(),
            document_uid: None,
            error: Some(error_chain(err)),
        }
    }
}

/// Extracts the document UID from a payload
///
/// Sidecar payloads are raw JSON responses; xattr payloads are the UID.
fn document_uid(payload: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(payload) {
        return match json.get("documentUid") {
            Some(serde_json::Value::String(uid)) => Some(uid.clone()),
            Some(serde_json::Value::Number(uid)) => Some(uid.to_string()),
            _ => None,
        };
    }

    let payload = payload.trim();
    let looks_like_uid = !payload.is_empty() && payload.len() <= 64 && !payload.contains(char::is_whitespace);
    looks_like_uid.then(|| payload.to_string())
}

/// Collects one row per file
pub fn collect(store: &dyn StateStore, files: &[PathBuf]) -> Vec<StatRow> {
    files
        .iter()
        .map(|file| {
            let name = file.display().to_string();
            match store.get(file) {
                Ok(record) => StatRow::from_record(name, record),
                Err(err) => StatRow::from_error(name, &err),
            }
        })
        .collect()
}

/// Lists the upload state of every file
pub fn run(cli: StatCli) -> Result<()> {
    let output = Output::new(cli.format, cli.verbose, false);

    let config = Config::load(cli.config.as_deref())?;
    let backend = cli.backend.or(config.backend).unwrap_or_default();
    let namespace = cli
        .namespace
        .or(config.namespace)
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let store = backend.open(&namespace);
    output.verbose_ctx("stat", &format!("Reading state from {}", store.describe()));

    let rows = collect(store.as_ref(), &cli.files);
    let failures = rows.iter().filter(|r| r.error.is_some()).count();

    if output.is_json() {
        output.data(&rows);
    } else {
        println!("{:<10} {:<10} {}", "Status", "DocID", "Filename");
        for row in &rows {
            println!(
                "{:<10} {:<10} {}",
                row.status,
                row.document_uid.as_deref().unwrap_or("-"),
                row.file
            );
            if let Some(error) = &row.error {
                output.verbose_ctx("stat", error);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) could not be inspected", failures, rows.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UploadStatus;
    use crate::storage::SidecarStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn uid_from_raw_response() {
        assert_eq!(
            document_uid(r#"{"success":true,"documentUid":"abc123"}"#),
            Some("abc123".to_string())
        );
        assert_eq!(document_uid(r#"{"success":false}"#), None);
    }

    #[test]
    fn uid_from_plain_payload() {
        assert_eq!(document_uid("abc123"), Some("abc123".to_string()));
        assert_eq!(document_uid("internal server error"), None);
        assert_eq!(document_uid(""), None);
    }

    #[test]
    fn rows_cover_fresh_done_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let fresh = dir.path().join("fresh.pdf");
        let done = dir.path().join("done.pdf");
        let missing = dir.path().join("missing.pdf");
        fs::write(&fresh, b"a").unwrap();
        fs::write(&done, b"b").unwrap();

        let store = SidecarStore::new();
        store
            .set(&done, UploadStatus::Done, Some(r#"{"success":true,"documentUid":"abc123"}"#))
            .unwrap();

        let rows = collect(&store, &[fresh, done, missing]);

        assert_eq!(rows[0].status, "-");
        assert_eq!(rows[0].document_uid, None);
        assert_eq!(rows[1].status, "done");
        assert_eq!(rows[1].document_uid.as_deref(), Some("abc123"));
        assert_eq!(rows[2].status, "missing");
        assert!(rows[2].error.is_some());
    }
}
