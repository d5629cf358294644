//! # Liveness Guard
//!
//! Detects whether another process holds the target file open, so a file
//! that is still being written (scanner, download, editor) is not uploaded.
//!
//! The check is best-effort: a file that is closed or reopened between the
//! check and the upload is not detected.
//!
//! | Kind | Mechanism |
//! |------|-----------|
//! | `lsof` | `lsof -t -- <file>` |
//! | `procfs` | scan of `/proc/<pid>/fd` links |
//! | `off` | no check |
//! | `auto` | `lsof` if installed, else `procfs` if `/proc` exists, else `off` |

mod lsof;
mod procfs;

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use lsof::LsofGuard;
pub use procfs::ProcFdGuard;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Cannot run {tool}")]
    Unavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
}

/// Open-file detection
pub trait LivenessGuard {
    /// Returns true if a process other than this one has the file open
    fn is_open_elsewhere(&self, file: &Path) -> Result<bool, GuardError>;

    fn describe(&self) -> String;
}

/// Guard that never reports a file as open
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGuard;

impl LivenessGuard for NoGuard {
    fn is_open_elsewhere(&self, _file: &Path) -> Result<bool, GuardError> {
        Ok(false)
    }

    fn describe(&self) -> String {
        "disabled".to_string()
    }
}

/// Configured guard mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    /// Pick the best available mechanism
    #[default]
    Auto,
    /// Ask `lsof`
    Lsof,
    /// Scan `/proc`
    Procfs,
    /// Skip the check
    Off,
}

impl GuardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardKind::Auto => "auto",
            GuardKind::Lsof => "lsof",
            GuardKind::Procfs => "procfs",
            GuardKind::Off => "off",
        }
    }

    /// Builds the guard, resolving `auto` against the running system
    pub fn build(&self, lsof_program: &Path) -> Box<dyn LivenessGuard> {
        match self {
            GuardKind::Lsof => Box::new(LsofGuard::new(lsof_program)),
            GuardKind::Procfs => Box::new(ProcFdGuard::new()),
            GuardKind::Off => Box::new(NoGuard),
            GuardKind::Auto => {
                if let Some(program) = find_program(lsof_program) {
                    Box::new(LsofGuard::new(program))
                } else if ProcFdGuard::available() {
                    Box::new(ProcFdGuard::new())
                } else {
                    Box::new(NoGuard)
                }
            }
        }
    }
}

/// Directories searched for programs in addition to `PATH`
///
/// Cron jobs often run with a `PATH` lacking the sbin directories.
const EXTRA_PROGRAM_DIRS: &[&str] = &["/usr/sbin", "/usr/bin", "/sbin", "/bin"];

/// Locates a program by explicit path, on `PATH`, or in the system directories
pub fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_dirs = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    path_dirs
        .into_iter()
        .chain(EXTRA_PROGRAM_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn no_guard_never_blocks() {
        assert!(!NoGuard.is_open_elsewhere(Path::new("/nonexistent")).unwrap());
    }

    #[test]
    fn off_builds_disabled_guard() {
        let guard = GuardKind::Off.build(Path::new("lsof"));
        assert_eq!(guard.describe(), "disabled");
    }

    #[test]
    fn find_program_accepts_explicit_paths() {
        let dir = TempDir::new().unwrap();
        let program = dir.path().join("fake-lsof");
        fs::write(&program, "#!/bin/sh\n").unwrap();

        assert_eq!(find_program(&program), Some(program.clone()));
        assert_eq!(find_program(&dir.path().join("missing")), None);
    }

    #[test]
    fn find_program_misses_unknown_names() {
        assert_eq!(find_program(Path::new("gmi-upload-no-such-program")), None);
    }
}
