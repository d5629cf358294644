//! `gmi-upload`: upload one document

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::settings::{Overrides, Settings};
use crate::api::HttpClient;
use crate::domain::UploadFlags;
use crate::guard::GuardKind;
use crate::output::{Output, OutputFormat};
use crate::storage::{Backend, Config};
use crate::upload::{Outcome, UploadJob, Uploader};

#[derive(Parser, Debug)]
#[command(name = "gmi-upload")]
#[command(version, about = "Upload a document to the GetMyInvoices API")]
pub struct UploadCli {
    /// API key
    #[arg(short = 'a', long = "apikey", env = "GMI_APIKEY", hide_env_values = true)]
    pub apikey: Option<String>,

    /// File to upload
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    /// GMI document type [default: MISC]
    #[arg(short = 'd', long, env = "GMI_DOCTYPE")]
    pub doctype: Option<String>,

    /// Note attached to the document
    #[arg(short = 'n', long, env = "GMI_DOCNOTE")]
    pub docnote: Option<String>,

    /// Re-attempt a dangling incomplete upload
    #[arg(short = 'r', long)]
    pub resume: bool,

    /// Upload again even if the file is marked as uploaded
    #[arg(short = 'R', long)]
    pub reupload: bool,

    /// Show verbose progress
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Do not report files that were already uploaded
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Config file [default: ~/.config/gmi-upload/config.toml]
    #[arg(long, env = "GMI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where upload state is kept [default: xattr]
    #[arg(long, env = "GMI_BACKEND", value_enum)]
    pub backend: Option<Backend>,

    /// Extended-attribute namespace [default: de.scsy.putmybills]
    #[arg(long, env = "GMI_NAMESPACE")]
    pub namespace: Option<String>,

    /// Upload endpoint
    #[arg(long, env = "GMI_ENDPOINT")]
    pub endpoint: Option<String>,

    /// How files open in other processes are detected [default: auto]
    #[arg(long, env = "GMI_GUARD", value_enum)]
    pub guard: Option<GuardKind>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

impl UploadCli {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.apikey.clone(),
            doctype: self.doctype.clone(),
            note: self.docnote.clone(),
            endpoint: self.endpoint.clone(),
            backend: self.backend,
            namespace: self.namespace.clone(),
            guard: self.guard,
        }
    }

    fn flags(&self) -> UploadFlags {
        UploadFlags {
            resume: self.resume,
            reupload: self.reupload,
            quiet: self.quiet,
        }
    }
}

/// Runs one upload
pub fn run(cli: UploadCli) -> Result<()> {
    let output = Output::new(cli.format, cli.verbose, cli.quiet);
    output.verbose("gmi-upload starting");

    let config = Config::load(cli.config.as_deref())?;
    let settings = Settings::resolve(cli.overrides(), config)?;
    settings.trace(&output);
    output.verbose_ctx("settings", &format!("{:<13}: {}", "File", cli.file.display()));

    let store = settings.backend.open(&settings.namespace);
    let guard = settings.guard.build(&settings.lsof);
    let api = HttpClient::new(settings.endpoint.as_str(), settings.api_key.as_str())
        .context("Failed to set up the API client")?;

    let job = UploadJob {
        file: cli.file.clone(),
        doctype: settings.doctype.clone(),
        note: settings.note.clone(),
        flags: cli.flags(),
    };

    let outcome = Uploader::new(store.as_ref(), guard.as_ref(), &api, &output).run(&job)?;

    if output.is_json() && !output.is_quiet() {
        let document_uid = match &outcome {
            Outcome::Uploaded { document_uid } => Some(document_uid.as_str()),
            Outcome::AlreadyDone => None,
        };
        output.data(&serde_json::json!({
            "file": cli.file.display().to_string(),
            "uploaded": document_uid.is_some(),
            "documentUid": document_uid,
        }));
    }

    output.verbose("Command completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_flags_parse() {
        let cli = UploadCli::try_parse_from([
            "gmi-upload", "-a", "key", "-f", "invoice.pdf", "-d", "RECEIPT", "-n", "note", "-r", "-R", "-v", "-q",
        ])
        .unwrap();

        assert_eq!(cli.apikey.as_deref(), Some("key"));
        assert_eq!(cli.file, PathBuf::from("invoice.pdf"));
        assert_eq!(cli.doctype.as_deref(), Some("RECEIPT"));
        assert_eq!(cli.docnote.as_deref(), Some("note"));
        assert_eq!(
            cli.flags(),
            UploadFlags {
                resume: true,
                reupload: true,
                quiet: true
            }
        );
        assert!(cli.verbose);
    }

    #[test]
    fn file_is_required() {
        assert!(UploadCli::try_parse_from(["gmi-upload", "-a", "key"]).is_err());
    }

    #[test]
    fn backend_and_guard_values() {
        let cli = UploadCli::try_parse_from([
            "gmi-upload", "-f", "a.pdf", "--backend", "sidecar", "--guard", "off",
        ])
        .unwrap();
        assert_eq!(cli.backend, Some(Backend::Sidecar));
        assert_eq!(cli.guard, Some(GuardKind::Off));
    }
}
