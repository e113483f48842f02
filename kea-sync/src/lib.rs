//! Reconcile IPAM inventory into live Kea DHCP servers.
//!
//! An inventory (service bindings, interfaces, addresses, prefixes and typed
//! relationship edges) describes which devices run DHCP, which subnets they
//! serve and which gateway, DNS and NTP addresses belong to each subnet. This
//! crate turns that into Kea `subnet4`/`subnet6` lists, merges them into the
//! configuration each server is running, and pushes the result back through
//! the Kea Control Agent.
//!
//! # Architecture
//!
//! ## Inventory
//!
//! - [`inventory`]: The [`inventory::Inventory`] query trait and a file-backed snapshot
//! - [`discovery`]: Find DHCP servers (UDP/67 bindings) and their interfaces
//! - [`prefix`]: Resolve a prefix to gateways, DNS/NTP servers and pools
//! - [`subnets`]: Build Kea subnet entries with shared ids and pool ranges
//!
//! ## Control
//!
//! - [`credentials`]: Per-host control API logins
//! - [`control`]: Command envelopes, the [`control::ControlApi`] seam and the HTTPS client
//! - [`sync`]: The per-server reconciliation state machine and run report
//!
//! ## Support
//!
//! - [`settings`]: `kea-sync.toml` loading with defaults
//! - [`report`]: Terminal rendering of runs, listings and diffs
//! - [`error`]: [`error::SyncError`] and its [`error::ErrorKind`] taxonomy
//!
//! # Examples
//!
//! ```ignore
//! use kea_sync::control::{ControlOptions, HttpConnector};
//! use kea_sync::credentials::CredentialStore;
//! use kea_sync::inventory::Snapshot;
//! use kea_sync::sync::Synchronizer;
//!
//! let inventory = Snapshot::load("inventory.json".as_ref())?;
//! let credentials = CredentialStore::load("credentials.toml".as_ref())?;
//! let connector = HttpConnector::new(ControlOptions::default());
//!
//! let report = Synchronizer::new(&inventory, &credentials, connector).run()?;
//! println!("failed servers: {}", report.failed_servers());
//! ```
//!
//! # Built on kea-config-core
//!
//! Document typing, parsing and structural diffing of Kea JSON live in
//! `kea-config-core`. Everything that knows about the inventory or the control
//! API is in this crate.

pub mod control;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod prefix;
pub mod report;
pub mod settings;
pub mod subnets;
pub mod sync;
