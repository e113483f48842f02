//! Building Kea `subnet4`/`subnet6` entries from resolved prefixes.
//!
//! Ids come from one counter per server that starts at 1 and is shared by both
//! families. Every bound prefix consumes an id, even one that ends up without
//! pools and therefore without a subnet entry.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use kea_config_core::{DhcpFamily, OptionData, Pool, Subnet};
use serde::Serialize;

use crate::discovery::ServerRecord;
use crate::error::SyncError;
use crate::inventory::{Endpoint, Inventory, Prefix, Relationship};
use crate::prefix::{resolve_prefix, ResolvedPrefix};

/// Subnet lists computed for one server, per family.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FamilySubnets {
    pub dhcp4: Vec<Subnet>,
    pub dhcp6: Vec<Subnet>,
}

impl FamilySubnets {
    pub fn for_family(&self, family: DhcpFamily) -> &[Subnet] {
        match family {
            DhcpFamily::Dhcp4 => &self.dhcp4,
            DhcpFamily::Dhcp6 => &self.dhcp6,
        }
    }
}

/// Option values of one subnet; `None` means the option is left out entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubnetOptions {
    pub domain_name_servers: Option<String>,
    pub ntp_servers: Option<String>,
    pub routers: Option<String>,
}

impl SubnetOptions {
    pub fn from_resolved(prefix: &ResolvedPrefix) -> Self {
        Self {
            domain_name_servers: join_addresses(&prefix.dns_servers),
            ntp_servers: join_addresses(&prefix.ntp_servers),
            routers: join_addresses(&prefix.gateways),
        }
    }

    /// Lower to Kea `option-data` in fixed order: DNS, NTP, routers.
    ///
    /// Both families use the same option names.
    pub fn into_option_data(self) -> Vec<OptionData> {
        let mut out = Vec::new();
        if let Some(data) = self.domain_name_servers {
            out.push(OptionData::new("domain-name-servers", data));
        }
        if let Some(data) = self.ntp_servers {
            out.push(OptionData::new("ntp-servers", data));
        }
        if let Some(data) = self.routers {
            out.push(OptionData::new("routers", data));
        }
        out
    }
}

/// Prefixes bound to the server's service through `ServerToSubnet` edges, in store order.
pub fn bound_prefixes<I>(inventory: &I, server: &ServerRecord) -> Result<Vec<Prefix>, SyncError>
where
    I: Inventory + ?Sized,
{
    let relationship = Relationship::ServerToSubnet;
    if !inventory.has_relationship(relationship)? {
        return Err(SyncError::not_found("relationship", relationship.key()));
    }

    let mut prefixes = Vec::new();
    for association in inventory.associations(relationship, Endpoint::Source(&server.service.id))? {
        let prefix = inventory
            .prefix(&association.destination)?
            .ok_or_else(|| SyncError::not_found("prefix", association.destination.clone()))?;
        prefixes.push(prefix);
    }
    Ok(prefixes)
}

/// Resolve every prefix bound to `server` and build its subnet lists.
pub fn build_subnets<I>(inventory: &I, server: &ServerRecord) -> Result<FamilySubnets, SyncError>
where
    I: Inventory + ?Sized,
{
    let resolved = bound_prefixes(inventory, server)?
        .iter()
        .map(|prefix| resolve_prefix(inventory, prefix))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(assemble_subnets(&resolved))
}

/// Number resolved prefixes and sort the resulting subnets by family.
pub fn assemble_subnets(resolved: &[ResolvedPrefix]) -> FamilySubnets {
    let mut out = FamilySubnets::default();
    for (id, prefix) in (1u32..).zip(resolved) {
        let Some(subnet) = build_subnet(id, prefix) else {
            continue;
        };
        match prefix.family {
            DhcpFamily::Dhcp4 => out.dhcp4.push(subnet),
            DhcpFamily::Dhcp6 => out.dhcp6.push(subnet),
        }
    }
    out
}

/// Build one subnet entry, or `None` when the prefix has no pools.
pub fn build_subnet(id: u32, prefix: &ResolvedPrefix) -> Option<Subnet> {
    let pools: Vec<Pool> = prefix
        .pools
        .iter()
        .map(|pool| Pool::new(pool_range(*pool)))
        .collect();
    if pools.is_empty() {
        return None;
    }

    let option_data = SubnetOptions::from_resolved(prefix).into_option_data();
    Some(Subnet::new(id, prefix.cidr(), option_data, pools))
}

/// Usable range of a pool: everything but the network and all-ones addresses.
///
/// Pools too small to have usable hosts produce an inverted range rather than an error.
pub fn pool_range(pool: IpNetwork) -> String {
    let (first, last): (IpAddr, IpAddr) = match pool {
        IpNetwork::V4(net) => {
            let host_mask = host_mask_v4(net.prefix());
            let base = u32::from(net.ip()) & !host_mask;
            let broadcast = base | host_mask;
            (
                Ipv4Addr::from(base.wrapping_add(1)).into(),
                Ipv4Addr::from(broadcast.wrapping_sub(1)).into(),
            )
        }
        IpNetwork::V6(net) => {
            let host_mask = host_mask_v6(net.prefix());
            let base = u128::from(net.ip()) & !host_mask;
            let all_ones = base | host_mask;
            (
                Ipv6Addr::from(base.wrapping_add(1)).into(),
                Ipv6Addr::from(all_ones.wrapping_sub(1)).into(),
            )
        }
    };
    format!("{first} - {last}")
}

fn host_mask_v4(prefix: u8) -> u32 {
    if prefix >= 32 {
        0
    } else {
        u32::MAX >> prefix
    }
}

fn host_mask_v6(prefix: u8) -> u128 {
    if prefix >= 128 {
        0
    } else {
        u128::MAX >> prefix
    }
}

fn join_addresses(addresses: &[IpAddr]) -> Option<String> {
    if addresses.is_empty() {
        return None;
    }
    Some(
        addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[cfg(test)]
mod tests;
