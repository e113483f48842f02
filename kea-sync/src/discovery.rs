//! Discovery of DHCP servers and the interfaces they must listen on.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::error::{FailureReport, SyncError};
use crate::inventory::{Inventory, Protocol, ServiceBinding, DHCP_SERVER_PORT};
use crate::subnets::{build_subnets, FamilySubnets};

/// One DHCP server found in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerRecord {
    /// Hosting device name; also the control API host and credential key.
    pub device: String,
    /// Interface names backing the bound addresses, de-duplicated.
    pub interfaces: BTreeSet<String>,
    /// Service binding the server was discovered from.
    pub service: ServiceBinding,
}

/// DHCP service bindings (UDP/67), in store order.
pub fn dhcp_service_bindings<I>(inventory: &I) -> Result<Vec<ServiceBinding>, SyncError>
where
    I: Inventory + ?Sized,
{
    Ok(inventory.service_bindings(Protocol::Udp, DHCP_SERVER_PORT)?)
}

/// Resolve a service binding's addresses to the interfaces of its device.
pub fn resolve_server<I>(inventory: &I, service: ServiceBinding) -> Result<ServerRecord, SyncError>
where
    I: Inventory + ?Sized,
{
    let mut interfaces = BTreeSet::new();
    for address in &service.ip_addresses {
        let iface = inventory
            .interface_for_address(address)?
            .ok_or_else(|| SyncError::not_found("interface for ip address", address.clone()))?;
        interfaces.insert(iface.name);
    }
    debug!(
        server = %service.device,
        interfaces = ?interfaces,
        "discovered DHCP server"
    );
    Ok(ServerRecord {
        device: service.device.clone(),
        interfaces,
        service,
    })
}

/// Enumerate and resolve every DHCP server, stopping at the first failure.
pub fn discover_servers<I>(inventory: &I) -> Result<Vec<ServerRecord>, SyncError>
where
    I: Inventory + ?Sized,
{
    dhcp_service_bindings(inventory)?
        .into_iter()
        .map(|service| resolve_server(inventory, service))
        .collect()
}

/// What discovery found for one service binding. Resolution errors stay per entry.
#[derive(Debug, Clone, Serialize)]
pub struct ServerListing {
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ServerRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<FamilySubnets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReport>,
}

/// List every DHCP server, optionally with the subnets it would serve.
pub fn list_servers<I>(inventory: &I, with_subnets: bool) -> Result<Vec<ServerListing>, SyncError>
where
    I: Inventory + ?Sized,
{
    let listings = dhcp_service_bindings(inventory)?
        .into_iter()
        .map(|service| {
            let device = service.device.clone();
            let resolved = resolve_server(inventory, service).and_then(|record| {
                let subnets = if with_subnets {
                    Some(build_subnets(inventory, &record)?)
                } else {
                    None
                };
                Ok((record, subnets))
            });
            match resolved {
                Ok((record, subnets)) => ServerListing {
                    device,
                    record: Some(record),
                    subnets,
                    error: None,
                },
                Err(err) => ServerListing {
                    device,
                    record: None,
                    subnets: None,
                    error: Some(FailureReport::from(&err)),
                },
            }
        })
        .collect();
    Ok(listings)
}
