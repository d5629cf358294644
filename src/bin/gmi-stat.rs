//! gmi-stat - show the upload state of files

use std::process::ExitCode;

use gmi_upload::cli::{self, StatCli};

fn main() -> ExitCode {
    let args = match cli::parse::<StatCli>() {
        Ok(args) => args,
        Err(code) => return code,
    };

    if let Err(e) = cli::run_stat(args) {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
