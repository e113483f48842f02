use std::fmt::{self, Display, Formatter};

use kea_config_core::{DhcpFamily, DocumentError};
use serde::Serialize;
use thiserror::Error;

use crate::inventory::InventoryError;

/// Errors raised while reconciling one DHCP server.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required inventory object, role, relationship or credential is absent.
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },
    /// A credential record matched but lacks a required field.
    #[error("malformed credential record for {host}: missing '{field}'")]
    MalformedRecord { host: String, field: &'static str },
    /// The control API could not be reached or a liveness probe failed.
    #[error("{target} unreachable: {message}")]
    Connectivity { target: String, message: String },
    /// `config-set` or `config-write` returned a non-zero result.
    #[error("{command} for {family} failed with result {code}: {text}")]
    Submission {
        family: DhcpFamily,
        command: &'static str,
        code: i64,
        text: String,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    /// The server returned a document that is not a usable Kea configuration.
    #[error("invalid {family} configuration from server: {source}")]
    Document {
        family: DhcpFamily,
        source: DocumentError,
    },
}

impl SyncError {
    pub(crate) fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub(crate) fn connectivity(target: impl Into<String>, message: impl Display) -> Self {
        Self::Connectivity {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Taxonomy class of the error, for reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound { .. } => ErrorKind::NotFound,
            SyncError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            SyncError::Connectivity { .. } => ErrorKind::Connectivity,
            SyncError::Submission { .. } => ErrorKind::Submission,
            SyncError::Inventory(_) => ErrorKind::Inventory,
            SyncError::Document { .. } => ErrorKind::Document,
        }
    }
}

/// Error taxonomy surfaced in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    MalformedRecord,
    Connectivity,
    Submission,
    Inventory,
    Document,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedRecord => "malformed_record",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::Submission => "submission",
            ErrorKind::Inventory => "inventory",
            ErrorKind::Document => "document",
        };
        f.write_str(name)
    }
}

/// Serializable snapshot of a [`SyncError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SyncError> for FailureReport {
    fn from(err: &SyncError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use kea_config_core::DhcpFamily;

    use super::{ErrorKind, FailureReport, SyncError};

    #[test]
    fn messages_and_kinds() {
        let err = SyncError::not_found("credential", "dhcp9");
        assert_eq!(err.to_string(), "credential not found: dhcp9");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = SyncError::Submission {
            family: DhcpFamily::Dhcp6,
            command: "config-set",
            code: 1,
            text: "subnet overlaps".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "config-set for dhcp6 failed with result 1: subnet overlaps"
        );

        let report = FailureReport::from(&SyncError::connectivity("dhcp4", "timed out"));
        assert_eq!(report.kind, ErrorKind::Connectivity);
        assert_eq!(report.message, "dhcp4 unreachable: timed out");
    }
}
