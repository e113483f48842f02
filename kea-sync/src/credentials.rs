//! Per-server control API credentials.
//!
//! Credentials live in a TOML file of `[[credential]]` tables:
//!
//! ```toml
//! [[credential]]
//! host = "dhcp1"
//! user = "kea-api"
//! password = "..."
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::error::SyncError;

/// Resolved login for one server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CredentialRecord {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    credential: Vec<CredentialRecord>,
}

/// Errors returned when loading the credentials file.
#[derive(Debug, Error)]
pub enum CredentialLoadError {
    #[error("failed to read credentials file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse credentials file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Keyed collection of credential records.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: Vec<CredentialRecord>,
}

impl CredentialStore {
    /// Load the credentials file.
    pub fn load(path: &Path) -> Result<Self, CredentialLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| CredentialLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, path.display().to_string())
    }

    pub fn from_toml_str(raw: &str, path: String) -> Result<Self, CredentialLoadError> {
        let parsed: CredentialFile =
            toml::from_str(raw).map_err(|source| CredentialLoadError::Parse { path, source })?;
        Ok(Self {
            records: parsed.credential,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the credential of `host` (exact match on the record's `host`).
    pub fn resolve(&self, host: &str) -> Result<Credential, SyncError> {
        let record = self
            .records
            .iter()
            .find(|r| r.host.as_deref() == Some(host))
            .ok_or_else(|| SyncError::not_found("credential", host))?;

        let user = record.user.clone().ok_or_else(|| SyncError::MalformedRecord {
            host: host.to_string(),
            field: "user",
        })?;
        let password = record
            .password
            .clone()
            .ok_or_else(|| SyncError::MalformedRecord {
                host: host.to_string(),
                field: "password",
            })?;

        Ok(Credential {
            host: host.to_string(),
            user,
            password,
        })
    }
}
