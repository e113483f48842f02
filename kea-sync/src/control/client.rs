use std::path::Path;
use std::time::Duration;

use kea_config_core::{ConfigDocument, DhcpFamily};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use super::{
    write_arguments, Command, CommandResult, ControlApi, Connector, Status, Subsystem,
};
use crate::credentials::Credential;
use crate::error::SyncError;

pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport settings shared by every server of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOptions {
    pub scheme: String,
    pub port: u16,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

impl ControlOptions {
    pub fn endpoint(&self, host: &str) -> String {
        format!("{}://{}:{}/", self.scheme, host, self.port)
    }
}

/// Blocking HTTP client for one server's Control Agent.
#[derive(Debug, Clone)]
pub struct KeaClient {
    http: Client,
    host: String,
    url: String,
    user: String,
    password: String,
}

impl KeaClient {
    pub fn new(
        host: &str,
        credential: &Credential,
        options: &ControlOptions,
    ) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|e| SyncError::connectivity(host, e))?;
        Ok(Self {
            http,
            host: host.to_string(),
            url: options.endpoint(host),
            user: credential.user.clone(),
            password: credential.password.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post `command` and return the first answer. Transport and decoding failures are `Connectivity`.
    pub fn execute(&self, command: &Command, target: Subsystem) -> Result<CommandResult, SyncError> {
        let label = format!("{} on {}", target, self.host);
        debug!(server = %self.host, command = command.command, service = %target, "sending control command");

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(command)
            .send()
            .map_err(|e| SyncError::connectivity(label.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SyncError::connectivity(
                label,
                format!("HTTP {status}: {}", body.trim()),
            ));
        }

        let body: Value = response
            .json()
            .map_err(|e| SyncError::connectivity(label.clone(), e))?;
        CommandResult::from_response(&body)
            .ok_or_else(|| SyncError::connectivity(label, "response carries no result"))
    }
}

impl ControlApi for KeaClient {
    fn status(&self, target: Subsystem) -> Result<Status, SyncError> {
        let result = self.execute(&Command::new("status-get", target), target)?;
        if !result.is_success() {
            return Err(SyncError::connectivity(
                format!("{} on {}", target, self.host),
                format!("status-get returned {}: {}", result.code, result.text),
            ));
        }
        Ok(Status::from_arguments(&result.arguments))
    }

    fn config_get(&self, family: DhcpFamily) -> Result<ConfigDocument, SyncError> {
        let target = Subsystem::from(family);
        let result = self.execute(&Command::new("config-get", target), target)?;
        if !result.is_success() {
            return Err(SyncError::connectivity(
                format!("{} on {}", target, self.host),
                format!("config-get returned {}: {}", result.code, result.text),
            ));
        }
        ConfigDocument::from_arguments(family, &result.arguments)
            .map_err(|source| SyncError::Document { family, source })
    }

    fn config_set(&self, document: &ConfigDocument) -> Result<CommandResult, SyncError> {
        let family = document.family;
        let arguments = document
            .to_arguments()
            .map_err(|source| SyncError::Document { family, source })?;
        let target = Subsystem::from(family);
        self.execute(
            &Command::new("config-set", target).with_arguments(arguments),
            target,
        )
    }

    fn config_write(&self, family: DhcpFamily, path: &Path) -> Result<CommandResult, SyncError> {
        let target = Subsystem::from(family);
        self.execute(
            &Command::new("config-write", target).with_arguments(write_arguments(path)),
            target,
        )
    }
}

/// Connects [`KeaClient`]s with shared [`ControlOptions`].
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    pub options: ControlOptions,
}

impl HttpConnector {
    pub fn new(options: ControlOptions) -> Self {
        Self { options }
    }
}

impl Connector for HttpConnector {
    type Api = KeaClient;

    fn connect(&self, host: &str, credential: &Credential) -> Result<KeaClient, SyncError> {
        KeaClient::new(host, credential, &self.options)
    }
}
