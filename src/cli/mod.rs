//! # Command-Line Interface
//!
//! Two binaries share this module:
//!
//! | Binary | Purpose |
//! |--------|---------|
//! | `gmi-upload` | Upload one file, tracking its state |
//! | `gmi-stat` | Show the recorded state of files |
//!
//! ## Settings
//!
//! Each setting is taken from the first source that has it:
//! command-line flag, `GMI_*` environment variable, config file, default.
//!
//! ## Exit Codes
//!
//! `0` on success, on an already uploaded file and on `--help`/`--version`;
//! `1` on any error, including invalid arguments.

mod settings;
mod stat;
mod upload;

use std::process::ExitCode;

use clap::Parser;

pub use settings::Settings;
pub use stat::{run as run_stat, StatCli, StatRow};
pub use upload::{run as run_upload, UploadCli};

/// Parses the command line, mapping usage errors to exit code 1
///
/// Returns the exit code to use when parsing did not yield arguments
/// (`--help`, `--version` or an error).
pub fn parse<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}
