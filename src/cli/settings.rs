//! Effective settings after layering flags, environment and config file

use std::path::PathBuf;

use crate::guard::GuardKind;
use crate::output::{mask, Output};
use crate::storage::{Backend, Config, ConfigError, DEFAULT_DOCTYPE, DEFAULT_ENDPOINT, DEFAULT_NAMESPACE};

/// Settings of one `gmi-upload` run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub doctype: String,
    pub note: Option<String>,
    pub endpoint: String,
    pub backend: Backend,
    pub namespace: String,
    pub guard: GuardKind,
    pub lsof: PathBuf,
}

/// Values given on the command line or through `GMI_*` variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub doctype: Option<String>,
    pub note: Option<String>,
    pub endpoint: Option<String>,
    pub backend: Option<Backend>,
    pub namespace: Option<String>,
    pub guard: Option<GuardKind>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Layers overrides over the config file over the defaults
    pub fn resolve(overrides: Overrides, config: Config) -> Result<Self, ConfigError> {
        let api_key = non_empty(overrides.api_key)
            .or_else(|| non_empty(config.api_key))
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            api_key,
            doctype: non_empty(overrides.doctype)
                .or_else(|| non_empty(config.doctype))
                .unwrap_or_else(|| DEFAULT_DOCTYPE.to_string()),
            note: non_empty(overrides.note).or_else(|| non_empty(config.note)),
            endpoint: non_empty(overrides.endpoint)
                .or_else(|| non_empty(config.endpoint))
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            backend: overrides.backend.or(config.backend).unwrap_or_default(),
            namespace: non_empty(overrides.namespace)
                .or_else(|| non_empty(config.namespace))
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            guard: overrides.guard.or(config.guard).unwrap_or_default(),
            lsof: config.lsof.unwrap_or_else(|| PathBuf::from("lsof")),
        })
    }

    /// Prints the settings in verbose mode, with the API key masked
    pub fn trace(&self, output: &Output) {
        let rows = [
            ("API key", mask(&self.api_key)),
            ("Document type", self.doctype.clone()),
            ("Note", self.note.clone().unwrap_or_else(|| "-".to_string())),
            ("Endpoint", self.endpoint.clone()),
            ("Backend", self.backend.as_str().to_string()),
            ("Namespace", self.namespace.clone()),
            ("Guard", self.guard.as_str().to_string()),
        ];
        for (name, value) in rows {
            output.verbose_ctx("settings", &format!("{:<13}: {}", name, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_key_given() {
        let overrides = Overrides {
            api_key: Some("key".into()),
            ..Default::default()
        };

        let settings = Settings::resolve(overrides, Config::default()).unwrap();
        assert_eq!(settings.doctype, "MISC");
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.backend, Backend::Xattr);
        assert_eq!(settings.namespace, "de.scsy.putmybills");
        assert_eq!(settings.guard, GuardKind::Auto);
        assert_eq!(settings.note, None);
    }

    #[test]
    fn overrides_beat_config_file() {
        let config = Config {
            api_key: Some("from-file".into()),
            doctype: Some("RECEIPT".into()),
            backend: Some(Backend::Sidecar),
            ..Default::default()
        };
        let overrides = Overrides {
            api_key: Some("from-flag".into()),
            backend: Some(Backend::Xattr),
            ..Default::default()
        };

        let settings = Settings::resolve(overrides, config).unwrap();
        assert_eq!(settings.api_key, "from-flag");
        assert_eq!(settings.doctype, "RECEIPT");
        assert_eq!(settings.backend, Backend::Xattr);
    }

    #[test]
    fn config_file_supplies_api_key() {
        let config = Config {
            api_key: Some("from-file".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(Overrides::default(), config).unwrap();
        assert_eq!(settings.api_key, "from-file");
    }

    #[test]
    fn missing_or_blank_api_key_is_an_error() {
        let err = Settings::resolve(Overrides::default(), Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));

        let blank = Overrides {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(blank, Config::default()).is_err());
    }
}
