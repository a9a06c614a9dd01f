//! Optional defaults file.
//!
//! `<config dir>/serbridge/config.json`, or whatever `--config` points at,
//! may set `device` and `baudrate`. Command-line flags win over the file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub device: Option<String>,
    pub baudrate: Option<u32>,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("serbridge").join("config.json"))
    }

    /// Loads `explicit` if given, otherwise the default file if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        if settings.baudrate == Some(0) {
            bail!("Invalid baudrate 0 in config file {}", path.display());
        }
        log::debug!("Loaded settings from {}: {settings:?}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_both_keys() {
        let file = write_config(r#"{ "device": "/dev/ttyACM0", "baudrate": 57600 }"#);
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.device.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(settings.baudrate, Some(57600));
    }

    #[test]
    fn keys_are_optional() {
        let file = write_config("{}");
        assert_eq!(Settings::load_from(file.path()).unwrap(), Settings::default());
    }

    #[test]
    fn rejects_unknown_keys() {
        let file = write_config(r#"{ "parity": "even" }"#);
        assert!(Settings::load_from(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_baudrate() {
        let file = write_config(r#"{ "baudrate": 0 }"#);
        let err = Settings::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid baudrate 0"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(Settings::load(Some(missing.as_path())).is_err());
    }
}
