//! gmi-upload - upload a document and track its upload state

use std::process::ExitCode;

use gmi_upload::cli::{self, UploadCli};

fn main() -> ExitCode {
    let args = match cli::parse::<UploadCli>() {
        Ok(args) => args,
        Err(code) => return code,
    };

    if let Err(e) = cli::run_upload(args) {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
