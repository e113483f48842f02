//! Resolution of a subnet prefix into the addresses and pools a DHCP server needs.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use kea_config_core::DhcpFamily;

use crate::error::SyncError;
use crate::inventory::{Endpoint, Inventory, Prefix, Relationship, DHCP_POOL_ROLE};

/// A subnet prefix with its gateway, DNS and NTP addresses and allocation pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrefix {
    pub family: DhcpFamily,
    pub network: IpAddr,
    pub prefix_len: u8,
    pub gateways: Vec<IpAddr>,
    pub dns_servers: Vec<IpAddr>,
    pub ntp_servers: Vec<IpAddr>,
    pub pools: Vec<IpNetwork>,
}

impl ResolvedPrefix {
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix_len)
    }

    /// Pools as `network/prefix_length` strings.
    pub fn pool_cidrs(&self) -> Vec<String> {
        self.pools
            .iter()
            .map(|pool| format!("{}/{}", pool.network(), pool.prefix()))
            .collect()
    }
}

/// Resolve `prefix` against the inventory.
pub fn resolve_prefix<I>(inventory: &I, prefix: &Prefix) -> Result<ResolvedPrefix, SyncError>
where
    I: Inventory + ?Sized,
{
    Ok(ResolvedPrefix {
        family: prefix.family(),
        network: prefix.network(),
        prefix_len: prefix.prefix_len(),
        gateways: gateways_of(inventory, prefix)?,
        dns_servers: dns_servers_of(inventory, prefix)?,
        ntp_servers: ntp_servers_of(inventory, prefix)?,
        pools: pools_of(inventory, prefix)?,
    })
}

/// Gateway addresses of `prefix`, in association order.
pub fn gateways_of<I>(inventory: &I, prefix: &Prefix) -> Result<Vec<IpAddr>, SyncError>
where
    I: Inventory + ?Sized,
{
    addresses_toward(inventory, Relationship::GatewayToSubnet, prefix)
}

/// DNS server addresses of `prefix`, in association order.
pub fn dns_servers_of<I>(inventory: &I, prefix: &Prefix) -> Result<Vec<IpAddr>, SyncError>
where
    I: Inventory + ?Sized,
{
    addresses_toward(inventory, Relationship::DnsToSubnet, prefix)
}

/// NTP server addresses of `prefix`, in association order.
pub fn ntp_servers_of<I>(inventory: &I, prefix: &Prefix) -> Result<Vec<IpAddr>, SyncError>
where
    I: Inventory + ?Sized,
{
    addresses_toward(inventory, Relationship::NtpToSubnet, prefix)
}

/// Child prefixes of `prefix` tagged as DHCP pools.
pub fn pools_of<I>(inventory: &I, prefix: &Prefix) -> Result<Vec<IpNetwork>, SyncError>
where
    I: Inventory + ?Sized,
{
    if !inventory.has_role(DHCP_POOL_ROLE)? {
        return Err(SyncError::not_found("prefix role", DHCP_POOL_ROLE));
    }

    Ok(inventory
        .child_prefixes(&prefix.id, DHCP_POOL_ROLE)?
        .into_iter()
        .map(|pool| pool.prefix)
        .collect())
}

// Follows `relationship` edges pointing at the prefix back to their source addresses.
fn addresses_toward<I>(
    inventory: &I,
    relationship: Relationship,
    prefix: &Prefix,
) -> Result<Vec<IpAddr>, SyncError>
where
    I: Inventory + ?Sized,
{
    if !inventory.has_relationship(relationship)? {
        return Err(SyncError::not_found("relationship", relationship.key()));
    }

    let mut out = Vec::new();
    for association in inventory.associations(relationship, Endpoint::Destination(&prefix.id))? {
        let address = inventory
            .ip_address(&association.source)?
            .ok_or_else(|| SyncError::not_found("ip address", association.source.clone()))?;
        out.push(address.host());
    }
    Ok(out)
}
