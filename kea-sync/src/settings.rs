//! Run settings loaded from `kea-sync.toml`.
//!
//! Every key is optional; command-line flags override what the file sets.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kea_config_core::DhcpFamily;
use serde::Deserialize;
use thiserror::Error;

use crate::control::client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, DEFAULT_TIMEOUT};
use crate::control::ControlOptions;

pub const DEFAULT_SETTINGS_FILE: &str = "kea-sync.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inventory snapshot (JSON or TOML).
    pub inventory: Option<PathBuf>,
    /// Credentials file.
    pub credentials: Option<PathBuf>,
    pub control: ControlSettings,
    pub persist: PersistSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub port: u16,
    pub scheme: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub accept_invalid_certs: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            scheme: "https".to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            accept_invalid_certs: false,
        }
    }
}

impl ControlSettings {
    pub fn options(&self) -> ControlOptions {
        ControlOptions {
            scheme: self.scheme.clone(),
            port: self.port,
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

/// Server-side paths handed to `config-write`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PersistSettings {
    pub dhcp4_path: PathBuf,
    pub dhcp6_path: PathBuf,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            dhcp4_path: PathBuf::from(DhcpFamily::Dhcp4.default_config_path()),
            dhcp6_path: PathBuf::from(DhcpFamily::Dhcp6.default_config_path()),
        }
    }
}

impl PersistSettings {
    pub fn path(&self, family: DhcpFamily) -> &Path {
        match family {
            DhcpFamily::Dhcp4 => &self.dhcp4_path,
            DhcpFamily::Dhcp6 => &self.dhcp6_path,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, path.display().to_string())
    }

    /// Load `path` if given, else the default file if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_toml_str(raw: &str, path: String) -> Result<Self, SettingsError> {
        toml::from_str(raw).map_err(|source| SettingsError::Parse { path, source })
    }
}
