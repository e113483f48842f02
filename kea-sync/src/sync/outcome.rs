use std::path::PathBuf;

use kea_config_core::{ConfigDocument, DhcpFamily, DiffEntry};
use serde::Serialize;

use crate::error::{FailureReport, SyncError};

/// Whether a run pushes configuration or only computes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Apply,
    Plan,
}

/// Steps of one server's reconciliation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Pending,
    Discovered,
    ConnectionEstablished,
    LivenessVerified,
    ConfigFetched,
    ConfigMerged,
    Submitted,
    Persisted,
    Failed,
}

/// Result of pushing one family's document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FamilyState {
    Persisted { path: PathBuf },
    SubmitFailed { failure: FailureReport },
    PersistFailed { failure: FailureReport },
    Planned { changes: Vec<DiffEntry> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyOutcome {
    pub family: DhcpFamily,
    #[serde(flatten)]
    pub state: FamilyState,
}

impl FamilyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self.state,
            FamilyState::Persisted { .. } | FamilyState::Planned { .. }
        )
    }
}

/// Everything known about one server after a run.
#[derive(Debug, Clone, Serialize)]
pub struct ServerOutcome {
    pub server: String,
    pub interfaces: Vec<String>,
    /// Final state: the last stage completed, or `Failed`.
    pub stage: SyncStage,
    /// Last stage completed before an abort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_after: Option<SyncStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReport>,
    pub families: Vec<FamilyOutcome>,
    /// Merged documents, kept for `plan --output-dir`.
    #[serde(skip)]
    pub documents: Vec<ConfigDocument>,
}

impl ServerOutcome {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            interfaces: Vec::new(),
            stage: SyncStage::Pending,
            failed_after: None,
            error: None,
            families: Vec::new(),
            documents: Vec::new(),
        }
    }

    pub(crate) fn advance(&mut self, stage: SyncStage) {
        self.stage = stage;
    }

    pub(crate) fn fail(&mut self, err: &SyncError) {
        self.failed_after = Some(self.stage);
        self.stage = SyncStage::Failed;
        self.error = Some(FailureReport::from(err));
    }

    pub(crate) fn record(&mut self, family: DhcpFamily, state: FamilyState) {
        self.families.push(FamilyOutcome { family, state });
    }

    pub fn family(&self, family: DhcpFamily) -> Option<&FamilyOutcome> {
        self.families.iter().find(|f| f.family == family)
    }

    /// `<server>-<family>.json`, with every character outside `[A-Za-z0-9._-]`
    /// in the server name replaced by `_` so the name stays a single path
    /// component.
    pub fn document_file_name(&self, family: DhcpFamily) -> String {
        let server: String = self
            .server
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{server}-{family}.json")
    }

    /// No abort and every family persisted (or planned).
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.families.iter().all(FamilyOutcome::is_success)
    }
}

/// Outcome of a whole run, one entry per discovered server in discovery order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: SyncMode,
    pub servers: Vec<ServerOutcome>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.servers.iter().all(ServerOutcome::is_success)
    }

    pub fn failed_servers(&self) -> usize {
        self.servers.iter().filter(|s| !s.is_success()).count()
    }
}
