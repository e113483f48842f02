//! Kea control API: command envelopes, responses and the client seam.
//!
//! The synchronizer only talks to servers through [`ControlApi`], so tests can
//! drive it with an in-memory fake while [`client::KeaClient`] speaks HTTPS to
//! the Control Agent.

pub mod client;

use std::fmt;
use std::path::Path;

use kea_config_core::{ConfigDocument, DhcpFamily};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::credentials::Credential;
use crate::error::SyncError;

pub use client::{ControlOptions, HttpConnector, KeaClient};

/// Daemon a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Subsystem {
    #[serde(rename = "ctrl-agent")]
    ControlAgent,
    #[serde(rename = "dhcp4")]
    Dhcp4,
    #[serde(rename = "dhcp6")]
    Dhcp6,
}

impl Subsystem {
    /// Probe order for liveness checks.
    pub const ALL: [Subsystem; 3] = [Subsystem::ControlAgent, Subsystem::Dhcp4, Subsystem::Dhcp6];

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::ControlAgent => "ctrl-agent",
            Subsystem::Dhcp4 => "dhcp4",
            Subsystem::Dhcp6 => "dhcp6",
        }
    }

    /// Value for the `service` list; the Control Agent handles commands without one.
    pub fn service(self) -> Option<&'static str> {
        match self {
            Subsystem::ControlAgent => None,
            other => Some(other.name()),
        }
    }
}

impl From<DhcpFamily> for Subsystem {
    fn from(family: DhcpFamily) -> Self {
        match family {
            DhcpFamily::Dhcp4 => Subsystem::Dhcp4,
            DhcpFamily::Dhcp6 => Subsystem::Dhcp6,
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request body posted to the Control Agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub command: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl Command {
    pub fn new(command: &'static str, target: Subsystem) -> Self {
        Self {
            command,
            service: target.service().into_iter().collect(),
            arguments: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// One `{result, text, arguments}` answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub code: i64,
    pub text: String,
    pub arguments: Value,
}

impl CommandResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            code: 0,
            text: text.into(),
            arguments: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Parse a response body: a list of per-service answers (first one wins) or a bare answer.
    pub fn from_response(body: &Value) -> Option<Self> {
        let answer = match body {
            Value::Array(items) => items.first()?,
            other => other,
        };
        let object = answer.as_object()?;
        Some(Self {
            code: object.get("result")?.as_i64()?,
            text: object
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            arguments: object.get("arguments").cloned().unwrap_or(Value::Null),
        })
    }
}

/// Parsed `status-get` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub pid: Option<u64>,
    pub uptime: Option<i64>,
}

impl Status {
    pub fn from_arguments(arguments: &Value) -> Self {
        Self {
            pid: arguments.get("pid").and_then(Value::as_u64),
            uptime: arguments.get("uptime").and_then(Value::as_i64),
        }
    }
}

/// Operations the synchronizer needs from one server.
pub trait ControlApi {
    /// `status-get` against `target`. Any failure, including a non-zero result, is `Connectivity`.
    fn status(&self, target: Subsystem) -> Result<Status, SyncError>;

    /// `config-get` for `family`, parsed into a document without its `hash`.
    fn config_get(&self, family: DhcpFamily) -> Result<ConfigDocument, SyncError>;

    /// `config-set` with the whole document. A non-zero result is returned, not raised.
    fn config_set(&self, document: &ConfigDocument) -> Result<CommandResult, SyncError>;

    /// `config-write` of the running configuration to `path` on the server.
    fn config_write(&self, family: DhcpFamily, path: &Path) -> Result<CommandResult, SyncError>;
}

/// Builds a [`ControlApi`] for one host.
pub trait Connector {
    type Api: ControlApi;

    fn connect(&self, host: &str, credential: &Credential) -> Result<Self::Api, SyncError>;
}

/// Arguments of a `config-write` command.
pub(crate) fn write_arguments(path: &Path) -> Value {
    let mut args = Map::new();
    args.insert(
        "filename".to_string(),
        Value::String(path.display().to_string()),
    );
    Value::Object(args)
}
