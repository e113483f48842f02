//! Per-server reconciliation of live Kea configuration against the inventory.
//!
//! Each discovered server walks `Discovered -> ConnectionEstablished ->
//! LivenessVerified -> ConfigFetched -> ConfigMerged -> Submitted -> Persisted`.
//! A failure before submission aborts that server only; submission and
//! persistence are tracked per family so one family failing never blocks the
//! other.

mod outcome;

use std::collections::BTreeSet;
use std::path::Path;

use kea_config_core::{
    diff_with_options, kea_key_fields, ConfigDocument, DhcpFamily, DiffEntry, DiffOptions,
    DocumentError, Subnet,
};
use tracing::{error, info, warn};

use crate::control::{CommandResult, Connector, ControlApi, Subsystem};
use crate::credentials::CredentialStore;
use crate::discovery::{dhcp_service_bindings, resolve_server};
use crate::error::{FailureReport, SyncError};
use crate::inventory::{Inventory, ServiceBinding};
use crate::settings::PersistSettings;
use crate::subnets::build_subnets;

pub use outcome::{FamilyOutcome, FamilyState, RunReport, ServerOutcome, SyncMode, SyncStage};

/// Drives every DHCP server of an inventory to its desired configuration.
pub struct Synchronizer<'a, I: ?Sized, C> {
    inventory: &'a I,
    credentials: &'a CredentialStore,
    connector: C,
    persist: PersistSettings,
    mode: SyncMode,
}

impl<'a, I, C> Synchronizer<'a, I, C>
where
    I: Inventory + ?Sized,
    C: Connector,
{
    pub fn new(inventory: &'a I, credentials: &'a CredentialStore, connector: C) -> Self {
        Self {
            inventory,
            credentials,
            connector,
            persist: PersistSettings::default(),
            mode: SyncMode::Apply,
        }
    }

    pub fn with_persist(mut self, persist: PersistSettings) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reconcile every server in discovery order.
    ///
    /// Only a failure to enumerate DHCP services is returned as an error; every
    /// per-server failure is captured in the report.
    pub fn run(&self) -> Result<RunReport, SyncError> {
        let services = dhcp_service_bindings(self.inventory)?;
        info!(servers = services.len(), mode = ?self.mode, "starting sync run");

        let servers: Vec<ServerOutcome> = services
            .into_iter()
            .map(|service| self.sync_server(service))
            .collect();

        let report = RunReport {
            mode: self.mode,
            servers,
        };
        info!(
            servers = report.servers.len(),
            failed = report.failed_servers(),
            "sync run finished"
        );
        Ok(report)
    }

    /// Reconcile a single server. Never fails; the outcome carries any error.
    pub fn sync_server(&self, service: ServiceBinding) -> ServerOutcome {
        let mut outcome = ServerOutcome::new(service.device.clone());
        if let Err(err) = self.drive(service, &mut outcome) {
            error!(
                server = %outcome.server,
                stage = ?outcome.stage,
                kind = %err.kind(),
                error = %err,
                "server sync aborted"
            );
            outcome.fail(&err);
        }
        outcome
    }

    fn drive(&self, service: ServiceBinding, outcome: &mut ServerOutcome) -> Result<(), SyncError> {
        let server = resolve_server(self.inventory, service)?;
        outcome.interfaces = server.interfaces.iter().cloned().collect();
        outcome.advance(SyncStage::Discovered);

        let credential = self.credentials.resolve(&server.device)?;
        let api = self.connector.connect(&server.device, &credential)?;
        outcome.advance(SyncStage::ConnectionEstablished);

        for subsystem in Subsystem::ALL {
            let status = api.status(subsystem)?;
            info!(server = %server.device, subsystem = %subsystem, pid = ?status.pid, "subsystem alive");
        }
        outcome.advance(SyncStage::LivenessVerified);

        let live = DhcpFamily::ALL
            .into_iter()
            .map(|family| api.config_get(family))
            .collect::<Result<Vec<_>, _>>()?;
        outcome.advance(SyncStage::ConfigFetched);

        let subnets = build_subnets(self.inventory, &server)?;
        let desired: Vec<ConfigDocument> = live
            .iter()
            .map(|doc| {
                merge_document(
                    doc,
                    &server.interfaces,
                    subnets.for_family(doc.family).to_vec(),
                )
            })
            .collect();
        outcome.advance(SyncStage::ConfigMerged);

        if self.mode == SyncMode::Plan {
            for (current, next) in live.iter().zip(&desired) {
                let changes = plan_changes(current, next)?;
                info!(
                    server = %server.device,
                    family = %next.family,
                    changes = changes.len(),
                    "planned configuration"
                );
                outcome.record(next.family, FamilyState::Planned { changes });
            }
            outcome.documents = desired;
            return Ok(());
        }

        let mut submitted = Vec::new();
        for document in &desired {
            match submit(&api, document) {
                Ok(()) => {
                    info!(server = %server.device, family = %document.family, "configuration submitted");
                    submitted.push(document.family);
                }
                Err(err) => {
                    warn!(server = %server.device, family = %document.family, error = %err, "config-set failed");
                    outcome.record(
                        document.family,
                        FamilyState::SubmitFailed {
                            failure: FailureReport::from(&err),
                        },
                    );
                }
            }
        }
        outcome.advance(SyncStage::Submitted);

        for family in submitted {
            let path = self.persist.path(family);
            match persist(&api, family, path) {
                Ok(()) => {
                    info!(server = %server.device, family = %family, path = %path.display(), "configuration persisted");
                    outcome.record(
                        family,
                        FamilyState::Persisted {
                            path: path.to_path_buf(),
                        },
                    );
                }
                Err(err) => {
                    warn!(server = %server.device, family = %family, error = %err, "config-write failed");
                    outcome.record(
                        family,
                        FamilyState::PersistFailed {
                            failure: FailureReport::from(&err),
                        },
                    );
                }
            }
        }
        outcome.families.sort_by_key(|f| f.family);
        if outcome
            .families
            .iter()
            .any(|f| matches!(f.state, FamilyState::Persisted { .. }))
        {
            outcome.advance(SyncStage::Persisted);
        }
        outcome.documents = desired;
        Ok(())
    }
}

/// Copy of `live` listening on `interfaces` and serving exactly `subnets`.
pub fn merge_document(
    live: &ConfigDocument,
    interfaces: &BTreeSet<String>,
    subnets: Vec<Subnet>,
) -> ConfigDocument {
    let mut merged = live.clone();
    merged.set_interfaces(interfaces.iter().cloned());
    merged.replace_subnets(subnets);
    merged
}

/// Structural changes `desired` makes to `live`, keyed like Kea's own lists.
pub fn plan_changes(
    live: &ConfigDocument,
    desired: &ConfigDocument,
) -> Result<Vec<DiffEntry>, SyncError> {
    let family = desired.family;
    let document_error = |source: DocumentError| SyncError::Document { family, source };
    let left = live.to_root().map_err(document_error)?;
    let right = desired.to_root().map_err(document_error)?;
    let options = DiffOptions {
        key_fields: kea_key_fields(),
        root: family.root_key().to_string(),
        ..DiffOptions::default()
    };
    Ok(diff_with_options(&left, &right, &options))
}

fn submit<A: ControlApi>(api: &A, document: &ConfigDocument) -> Result<(), SyncError> {
    let result = api.config_set(document)?;
    check(document.family, "config-set", result)
}

fn persist<A: ControlApi>(
    api: &A,
    family: DhcpFamily,
    path: &Path,
) -> Result<(), SyncError> {
    let result = api.config_write(family, path)?;
    check(family, "config-write", result)
}

fn check(family: DhcpFamily, command: &'static str, result: CommandResult) -> Result<(), SyncError> {
    if result.is_success() {
        Ok(())
    } else {
        Err(SyncError::Submission {
            family,
            command,
            code: result.code,
            text: result.text,
        })
    }
}

#[cfg(test)]
mod tests;
