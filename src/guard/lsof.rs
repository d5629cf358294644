//! `lsof` based open-file detection

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{GuardError, LivenessGuard};

/// Asks `lsof -t` which processes hold a file open
#[derive(Debug, Clone)]
pub struct LsofGuard {
    program: PathBuf,
}

impl LsofGuard {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn tool(&self) -> String {
        self.program.display().to_string()
    }
}

/// Parses `lsof -t` output into PIDs other than our own
fn foreign_pids(stdout: &[u8], own_pid: u32) -> Vec<u32> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| *pid != own_pid)
        .collect()
}

impl LivenessGuard for LsofGuard {
    fn is_open_elsewhere(&self, file: &Path) -> Result<bool, GuardError> {
        let output = Command::new(&self.program)
            .arg("-t")
            .arg("--")
            .arg(file)
            .output()
            .map_err(|source| GuardError::Unavailable {
                tool: self.tool(),
                source,
            })?;

        // lsof exits 1 when nothing matched
        match output.status.code() {
            Some(0) => Ok(!foreign_pids(&output.stdout, std::process::id()).is_empty()),
            Some(1) if output.stdout.iter().all(u8::is_ascii_whitespace) => Ok(false),
            _ => Err(GuardError::Failed {
                tool: self.tool(),
                message: format!(
                    "{} ({})",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }),
        }
    }

    fn describe(&self) -> String {
        format!("lsof ({})", self.program.display())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Writes an executable stand-in for lsof
    fn fake_lsof(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("lsof");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn parses_pid_list() {
        assert_eq!(foreign_pids(b"12\n34\n", 12), vec![34]);
        assert!(foreign_pids(b"\n", 12).is_empty());
    }

    #[test]
    fn exit_one_means_not_open() {
        let dir = TempDir::new().unwrap();
        let guard = LsofGuard::new(fake_lsof(dir.path(), "exit 1"));
        assert!(!guard.is_open_elsewhere(Path::new("invoice.pdf")).unwrap());
    }

    #[test]
    fn listed_pid_means_open() {
        let dir = TempDir::new().unwrap();
        let guard = LsofGuard::new(fake_lsof(dir.path(), "echo 1\nexit 0"));
        assert!(guard.is_open_elsewhere(Path::new("invoice.pdf")).unwrap());
    }

    #[test]
    fn other_failures_are_errors() {
        let dir = TempDir::new().unwrap();
        let guard = LsofGuard::new(fake_lsof(dir.path(), "echo denied >&2\nexit 2"));
        let err = guard.is_open_elsewhere(Path::new("invoice.pdf")).unwrap_err();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let guard = LsofGuard::new("/nonexistent/lsof");
        assert!(matches!(
            guard.is_open_elsewhere(Path::new("invoice.pdf")),
            Err(GuardError::Unavailable { .. })
        ));
    }
}
