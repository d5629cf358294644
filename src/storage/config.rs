//! Configuration handling for gmi-upload
//!
//! Settings are layered: built-in defaults, then the TOML file at
//! `~/.config/gmi-upload/config.toml` (or `--config`), then `GMI_*`
//! environment variables and command-line flags, which clap merges.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Backend;
use crate::guard::GuardKind;

/// Upload endpoint of the GetMyInvoices accounts API
pub const DEFAULT_ENDPOINT: &str = "https://api.getmyinvoices.com/accounts/v3/documents";

/// Document type used when none is given
pub const DEFAULT_DOCTYPE: &str = "MISC";

/// Extended-attribute namespace of earlier deployments
pub const DEFAULT_NAMESPACE: &str = "de.scsy.putmybills";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("No API key given. Use --apikey, GMI_APIKEY or api_key in the config file.")]
    MissingApiKey,
}

/// Settings read from the configuration file
///
/// Every field is optional; unset fields fall back to flags and defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key sent as `X-API-KEY`
    pub api_key: Option<String>,

    /// Document type, e.g. `MISC` or `INCOMING_INVOICE`
    pub doctype: Option<String>,

    /// Note attached to every uploaded document
    pub note: Option<String>,

    /// Upload endpoint
    pub endpoint: Option<String>,

    /// Where upload records are kept
    pub backend: Option<Backend>,

    /// Extended-attribute namespace
    pub namespace: Option<String>,

    /// How open files are detected
    pub guard: Option<GuardKind>,

    /// Path to the `lsof` program
    pub lsof: Option<PathBuf>,
}

impl Config {
    /// Returns the default config file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("de", "scsy", "gmi-upload")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads the configuration
    ///
    /// An explicitly named file must exist; a missing default file yields
    /// the empty configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()).into());
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };

        Self::load_file(&path)
    }

    /// Loads configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_config_has_no_overrides() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
api_key = "secret"
doctype = "INCOMING_INVOICE"
note = "scanned"
endpoint = "http://127.0.0.1:8080/documents"
backend = "sidecar"
namespace = "org.example"
guard = "procfs"
lsof = "/usr/sbin/lsof"
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.doctype.as_deref(), Some("INCOMING_INVOICE"));
        assert_eq!(config.backend, Some(Backend::Sidecar));
        assert_eq!(config.guard, Some(GuardKind::Procfs));
        assert_eq!(config.lsof, Some(PathBuf::from("/usr/sbin/lsof")));
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let err = Config::parse(r#"backend = "database""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "doctype = \"RECEIPT\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.doctype.as_deref(), Some("RECEIPT"));
    }
}
