use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use kea_config_core::{ConfigDocument, DhcpFamily, DiffEntry};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use super::{FamilyState, ServerOutcome, SyncMode, SyncStage, Synchronizer};
use crate::control::{CommandResult, Connector, ControlApi, Status, Subsystem};
use crate::credentials::{Credential, CredentialStore};
use crate::error::{ErrorKind, SyncError};
use crate::inventory::{
    Association, Interface, IpAddress, Prefix, Protocol, Relationship, ServiceBinding, Snapshot,
};
use crate::settings::PersistSettings;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Status(Subsystem),
    Get(DhcpFamily),
    Set(DhcpFamily, Value),
    Write(DhcpFamily, PathBuf),
}

/// Scripted behavior of every fake server.
#[derive(Default)]
struct Script {
    dead: Vec<(String, Subsystem)>,
    set_codes: HashMap<(String, DhcpFamily), i64>,
    write_codes: HashMap<(String, DhcpFamily), i64>,
}

type Log = Rc<RefCell<Vec<(String, Call)>>>;

struct FakeApi {
    host: String,
    script: Rc<Script>,
    log: Log,
}

impl FakeApi {
    fn record(&self, call: Call) {
        self.log.borrow_mut().push((self.host.clone(), call));
    }

    fn code(&self, codes: &HashMap<(String, DhcpFamily), i64>, family: DhcpFamily) -> CommandResult {
        match codes.get(&(self.host.clone(), family)) {
            Some(&code) if code != 0 => CommandResult {
                code,
                text: format!("rejected by {}", self.host),
                arguments: Value::Null,
            },
            _ => CommandResult::success("ok"),
        }
    }
}

fn live_arguments(family: DhcpFamily) -> Value {
    let mut root = json!({
        "hash": "5f1e",
        "valid-lifetime": 4000,
        "interfaces-config": {"interfaces": ["old0"], "re-detect": true},
    });
    root[family.subnet_key()] = json!([{"id": 77, "subnet": "192.168.0.0/24", "pools": []}]);
    let mut arguments = Map::new();
    arguments.insert(family.root_key().to_string(), root);
    arguments.insert("hash".to_string(), json!("5f1e"));
    Value::Object(arguments)
}

impl ControlApi for FakeApi {
    fn status(&self, target: Subsystem) -> Result<Status, SyncError> {
        self.record(Call::Status(target));
        if self.script.dead.contains(&(self.host.clone(), target)) {
            return Err(SyncError::connectivity(
                format!("{} on {}", target, self.host),
                "connection refused",
            ));
        }
        Ok(Status {
            pid: Some(100),
            uptime: None,
        })
    }

    fn config_get(&self, family: DhcpFamily) -> Result<ConfigDocument, SyncError> {
        self.record(Call::Get(family));
        ConfigDocument::from_arguments(family, &live_arguments(family))
            .map_err(|source| SyncError::Document { family, source })
    }

    fn config_set(&self, document: &ConfigDocument) -> Result<CommandResult, SyncError> {
        let arguments = document.to_arguments().expect("arguments");
        self.record(Call::Set(document.family, arguments));
        Ok(self.code(&self.script.set_codes, document.family))
    }

    fn config_write(&self, family: DhcpFamily, path: &Path) -> Result<CommandResult, SyncError> {
        self.record(Call::Write(family, path.to_path_buf()));
        Ok(self.code(&self.script.write_codes, family))
    }
}

struct FakeConnector {
    script: Rc<Script>,
    log: Log,
}

impl Connector for FakeConnector {
    type Api = FakeApi;

    fn connect(&self, host: &str, _credential: &Credential) -> Result<FakeApi, SyncError> {
        Ok(FakeApi {
            host: host.to_string(),
            script: Rc::clone(&self.script),
            log: Rc::clone(&self.log),
        })
    }
}

fn string(raw: &str) -> String {
    raw.to_string()
}

/// Two servers, each serving one v4 and one v6 prefix.
fn inventory() -> Snapshot {
    let mut snapshot = Snapshot::default();
    for (n, device) in ["dhcp1", "dhcp2"].into_iter().enumerate() {
        let n = n + 1;
        snapshot.services.push(ServiceBinding {
            id: format!("svc-{n}"),
            name: string("dhcp"),
            device: string(device),
            protocol: Protocol::Udp,
            ports: vec![67],
            ip_addresses: vec![format!("ip-{n}"), format!("ip6-{n}")],
        });
        snapshot.interfaces.push(Interface {
            id: format!("if-{n}"),
            device: string(device),
            name: string("eth1"),
            ip_addresses: vec![format!("ip-{n}")],
        });
        snapshot.interfaces.push(Interface {
            id: format!("if6-{n}"),
            device: string(device),
            name: string("eth0"),
            ip_addresses: vec![format!("ip6-{n}")],
        });
        snapshot.ip_addresses.push(IpAddress {
            id: format!("ip-{n}"),
            address: format!("10.{n}.0.1/24").parse().expect("address"),
        });
        snapshot.ip_addresses.push(IpAddress {
            id: format!("ip6-{n}"),
            address: format!("2001:db8:{n}::1/64").parse().expect("address"),
        });
        for (id, cidr, role, parent) in [
            (format!("net-{n}"), format!("10.{n}.0.0/24"), None, None),
            (
                format!("pool-{n}"),
                format!("10.{n}.0.0/28"),
                Some(string("dhcp-pool")),
                Some(format!("net-{n}")),
            ),
            (format!("net6-{n}"), format!("2001:db8:{n}::/64"), None, None),
            (
                format!("pool6-{n}"),
                format!("2001:db8:{n}::/120"),
                Some(string("dhcp-pool")),
                Some(format!("net6-{n}")),
            ),
        ] {
            snapshot.prefixes.push(Prefix {
                id,
                prefix: cidr.parse().expect("cidr"),
                role,
                parent,
            });
        }
        for destination in [format!("net-{n}"), format!("net6-{n}")] {
            snapshot.associations.push(Association {
                relationship: Relationship::ServerToSubnet,
                source: format!("svc-{n}"),
                destination,
            });
        }
    }
    snapshot
}

fn credentials(hosts: &[&str]) -> CredentialStore {
    let raw: String = hosts
        .iter()
        .map(|host| format!("[[credential]]\nhost = \"{host}\"\nuser = \"kea\"\npassword = \"pw\"\n"))
        .collect();
    CredentialStore::from_toml_str(&raw, string("inline")).expect("credentials")
}

fn harness(script: Script) -> (FakeConnector, Log) {
    let log: Log = Rc::default();
    (
        FakeConnector {
            script: Rc::new(script),
            log: Rc::clone(&log),
        },
        log,
    )
}

fn calls_for(log: &Log, host: &str) -> Vec<Call> {
    log.borrow()
        .iter()
        .filter(|(h, _)| h == host)
        .map(|(_, call)| call.clone())
        .collect()
}

#[test]
fn pushes_merged_documents_and_persists_both_families() {
    let snapshot = inventory();
    let store = credentials(&["dhcp1", "dhcp2"]);
    let (connector, log) = harness(Script::default());

    let report = Synchronizer::new(&snapshot, &store, connector)
        .run()
        .expect("run");

    assert!(report.is_success());
    assert_eq!(report.servers.len(), 2);
    let first = &report.servers[0];
    assert_eq!(first.server, "dhcp1");
    assert_eq!(first.stage, SyncStage::Persisted);
    assert_eq!(first.interfaces, vec!["eth0", "eth1"]);
    assert_eq!(
        first.family(DhcpFamily::Dhcp6).map(|f| &f.state),
        Some(&FamilyState::Persisted {
            path: PathBuf::from("/etc/kea/kea-dhcp6.conf")
        })
    );

    let calls = calls_for(&log, "dhcp1");
    assert_eq!(
        calls[..5].to_vec(),
        vec![
            Call::Status(Subsystem::ControlAgent),
            Call::Status(Subsystem::Dhcp4),
            Call::Status(Subsystem::Dhcp6),
            Call::Get(DhcpFamily::Dhcp4),
            Call::Get(DhcpFamily::Dhcp6),
        ]
    );
    let Call::Set(DhcpFamily::Dhcp4, sent) = &calls[5] else {
        panic!("expected config-set for dhcp4, got {:?}", calls[5]);
    };
    assert_eq!(
        sent,
        &json!({"Dhcp4": {
            "valid-lifetime": 4000,
            "interfaces-config": {"interfaces": ["eth0", "eth1"], "re-detect": true},
            "subnet4": [{
                "id": 1,
                "subnet": "10.1.0.0/24",
                "option-data": [],
                "pools": [{"pool": "10.1.0.1 - 10.1.0.14"}]
            }]
        }})
    );
    assert!(sent["Dhcp4"].get("hash").is_none());
    assert_eq!(
        calls[7..].to_vec(),
        vec![
            Call::Write(DhcpFamily::Dhcp4, PathBuf::from("/etc/kea/kea-dhcp4.conf")),
            Call::Write(DhcpFamily::Dhcp6, PathBuf::from("/etc/kea/kea-dhcp6.conf")),
        ]
    );
}

#[test]
fn dhcp6_liveness_failure_aborts_before_config_get() {
    let snapshot = inventory();
    let store = credentials(&["dhcp1", "dhcp2"]);
    let (connector, log) = harness(Script {
        dead: vec![(string("dhcp1"), Subsystem::Dhcp6)],
        ..Script::default()
    });

    let report = Synchronizer::new(&snapshot, &store, connector)
        .run()
        .expect("run");

    let first = &report.servers[0];
    assert_eq!(first.stage, SyncStage::Failed);
    assert_eq!(first.failed_after, Some(SyncStage::ConnectionEstablished));
    let error = first.error.as_ref().expect("error");
    assert_eq!(error.kind, ErrorKind::Connectivity);
    assert!(error.message.starts_with("dhcp6 on dhcp1"));
    assert!(calls_for(&log, "dhcp1")
        .iter()
        .all(|call| !matches!(call, Call::Get(_) | Call::Set(..) | Call::Write(..))));

    assert!(report.servers[1].is_success());
    assert!(!report.is_success());
}

#[test]
fn rejected_dhcp4_submit_still_pushes_dhcp6() {
    let snapshot = inventory();
    let store = credentials(&["dhcp1", "dhcp2"]);
    let mut set_codes = HashMap::new();
    set_codes.insert((string("dhcp1"), DhcpFamily::Dhcp4), 1);
    let (connector, log) = harness(Script {
        set_codes,
        ..Script::default()
    });

    let report = Synchronizer::new(&snapshot, &store, connector)
        .run()
        .expect("run");

    let first = &report.servers[0];
    assert!(first.error.is_none());
    assert!(!first.is_success());
    let FamilyState::SubmitFailed { failure } = &first.families[0].state else {
        panic!("expected dhcp4 submit failure, got {:?}", first.families[0]);
    };
    assert_eq!(failure.kind, ErrorKind::Submission);
    assert_eq!(
        failure.message,
        "config-set for dhcp4 failed with result 1: rejected by dhcp1"
    );
    assert_eq!(first.families[1].family, DhcpFamily::Dhcp6);
    assert!(first.families[1].is_success());

    let writes: Vec<Call> = calls_for(&log, "dhcp1")
        .into_iter()
        .filter(|call| matches!(call, Call::Write(..)))
        .collect();
    assert_eq!(
        writes,
        vec![Call::Write(DhcpFamily::Dhcp6, PathBuf::from("/etc/kea/kea-dhcp6.conf"))]
    );
}

#[test]
fn both_families_rejected_stops_at_submitted() {
    let snapshot = inventory();
    let store = credentials(&["dhcp1", "dhcp2"]);
    let mut set_codes = HashMap::new();
    set_codes.insert((string("dhcp1"), DhcpFamily::Dhcp4), 1);
    set_codes.insert((string("dhcp1"), DhcpFamily::Dhcp6), 1);
    let (connector, log) = harness(Script {
        set_codes,
        ..Script::default()
    });

    let report = Synchronizer::new(&snapshot, &store, connector)
        .run()
        .expect("run");

    let first = &report.servers[0];
    assert_eq!(first.stage, SyncStage::Submitted);
    assert!(first.error.is_none());
    assert!(first
        .families
        .iter()
        .all(|f| matches!(f.state, FamilyState::SubmitFailed { .. })));
    assert!(calls_for(&log, "dhcp1")
        .iter()
        .all(|call| !matches!(call, Call::Write(..))));
    assert_eq!(report.servers[1].stage, SyncStage::Persisted);
}

#[test]
fn failed_config_write_is_reported_per_family() {
    let snapshot = inventory();
    let store = credentials(&["dhcp1", "dhcp2"]);
    let mut write_codes = HashMap::new();
    write_codes.insert((string("dhcp2"), DhcpFamily::Dhcp6), 1);
    let (connector, _log) = harness(Script {
        write_codes,
        ..Script::default()
    });
    let persist = PersistSettings {
        dhcp4_path: PathBuf::from("/srv/kea/v4.json"),
        dhcp6_path: PathBuf::from("/srv/kea/v6.json"),
    };

    let report = Synchronizer::new(&snapshot, &store, connector)
        .with_persist(persist)
        .run()
        .expect("run");

    let second = &report.servers[1];
    assert_eq!(
        second.family(DhcpFamily::Dhcp4).map(|f| &f.state),
        Some(&FamilyState::Persisted {
            path: PathBuf::from("/srv/kea/v4.json")
        })
    );
    assert!(matches!(
        second.family(DhcpFamily::Dhcp6).map(|f| &f.state),
        Some(FamilyState::PersistFailed { .. })
    ));
    assert_eq!(report.failed_servers(), 1);
}

#[test]
fn missing_credential_isolates_one_server() {
    let snapshot = inventory();
    let store = credentials(&["dhcp2"]);
    let (connector, log) = harness(Script::default());

    let report = Synchronizer::new(&snapshot, &store, connector)
        .run()
        .expect("run");

    let first = &report.servers[0];
    assert_eq!(first.failed_after, Some(SyncStage::Discovered));
    assert_eq!(
        first.error.as_ref().map(|e| e.message.as_str()),
        Some("credential not found: dhcp1")
    );
    assert!(calls_for(&log, "dhcp1").is_empty());
    assert_eq!(report.servers[1].stage, SyncStage::Persisted);
}

#[test]
fn plan_mode_never_sets_or_writes() {
    let snapshot = inventory();
    let store = credentials(&["dhcp1", "dhcp2"]);
    let (connector, log) = harness(Script::default());

    let report = Synchronizer::new(&snapshot, &store, connector)
        .with_mode(SyncMode::Plan)
        .run()
        .expect("run");

    assert!(report.is_success());
    assert!(log
        .borrow()
        .iter()
        .all(|(_, call)| !matches!(call, Call::Set(..) | Call::Write(..))));

    let first = &report.servers[0];
    assert_eq!(first.stage, SyncStage::ConfigMerged);
    assert_eq!(first.documents.len(), 2);
    let FamilyState::Planned { changes } = &first.families[0].state else {
        panic!("expected a plan, got {:?}", first.families[0]);
    };
    let paths: Vec<&str> = changes.iter().map(DiffEntry::path).collect();
    assert!(paths.contains(&"Dhcp4.subnet4[192.168.0.0/24]"));
    assert!(paths.contains(&"Dhcp4.subnet4[10.1.0.0/24]"));
    assert!(paths.iter().all(|p| !p.contains("valid-lifetime")));
}

#[test]
fn document_file_names_stay_inside_the_output_directory() {
    let plain = ServerOutcome::new("dhcp1.lab");
    assert_eq!(plain.document_file_name(DhcpFamily::Dhcp4), "dhcp1.lab-dhcp4.json");

    let hostile = ServerOutcome::new("../../etc/cron.d/x");
    let name = hostile.document_file_name(DhcpFamily::Dhcp6);
    assert_eq!(name, ".._.._etc_cron.d_x-dhcp6.json");
    assert_eq!(Path::new(&name).components().count(), 1);

    let spaced = ServerOutcome::new("rack 4\\dhcp");
    assert_eq!(spaced.document_file_name(DhcpFamily::Dhcp4), "rack_4_dhcp-dhcp4.json");
}
