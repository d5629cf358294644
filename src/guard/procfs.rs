//! `/proc` based open-file detection (Linux)

use std::fs;
use std::path::{Path, PathBuf};

use super::{GuardError, LivenessGuard};

/// Scans `/proc/<pid>/fd` of every visible process
///
/// Processes whose descriptors we may not read (other users) are skipped.
#[derive(Debug, Clone)]
pub struct ProcFdGuard {
    root: PathBuf,
}

impl Default for ProcFdGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcFdGuard {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/proc"),
        }
    }

    /// Returns true if this system exposes per-process descriptors
    pub fn available() -> bool {
        Path::new("/proc/self/fd").is_dir()
    }

    fn holds_open(&self, pid_dir: &Path, target: &Path) -> bool {
        let Ok(fds) = fs::read_dir(pid_dir.join("fd")) else {
            return false;
        };

        fds.filter_map(|fd| fd.ok())
            .filter_map(|fd| fs::read_link(fd.path()).ok())
            .any(|link| link == target)
    }
}

impl LivenessGuard for ProcFdGuard {
    fn is_open_elsewhere(&self, file: &Path) -> Result<bool, GuardError> {
        let target = fs::canonicalize(file).map_err(|source| GuardError::Unavailable {
            tool: "procfs".to_string(),
            source,
        })?;

        let processes = fs::read_dir(&self.root).map_err(|source| GuardError::Unavailable {
            tool: "procfs".to_string(),
            source,
        })?;

        let own_pid = std::process::id();

        for entry in processes.filter_map(|e| e.ok()) {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };

            if pid != own_pid && self.holds_open(&entry.path(), &target) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn describe(&self) -> String {
        format!("procfs ({})", self.root.display())
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use std::fs::File;
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn closed_file_is_not_open() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("invoice.pdf");
        fs::write(&file, b"%PDF").unwrap();

        assert!(!ProcFdGuard::new().is_open_elsewhere(&file).unwrap());
    }

    #[test]
    fn own_handles_are_ignored() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("invoice.pdf");
        fs::write(&file, b"%PDF").unwrap();
        let _handle = File::open(&file).unwrap();

        assert!(!ProcFdGuard::new().is_open_elsewhere(&file).unwrap());
    }

    #[test]
    fn file_held_by_child_is_open() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("invoice.pdf");
        fs::write(&file, b"%PDF").unwrap();

        let mut child = Command::new("sleep")
            .arg("10")
            .stdin(Stdio::from(File::open(&file).unwrap()))
            .spawn()
            .unwrap();

        // The child's descriptor table is visible once it has exec'd
        let guard = ProcFdGuard::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut open = false;
        while Instant::now() < deadline {
            if guard.is_open_elsewhere(&file).unwrap() {
                open = true;
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }

        child.kill().unwrap();
        child.wait().unwrap();
        assert!(open);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(ProcFdGuard::new()
            .is_open_elsewhere(&dir.path().join("missing.pdf"))
            .is_err());
    }
}
