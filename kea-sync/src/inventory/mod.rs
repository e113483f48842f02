//! Inventory (IPAM) model and query interface.
//!
//! The reconciliation engine never talks to an IPAM directly: everything it
//! needs goes through the [`Inventory`] trait. [`Snapshot`] is the file-backed
//! implementation used by the CLI, loaded from a JSON or TOML export.

use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use kea_config_core::DhcpFamily;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod snapshot;

pub use snapshot::Snapshot;

/// Identifier of an inventory entity (usually a UUID string).
pub type EntityId = String;

/// Role tag carried by prefixes that are DHCP allocation pools.
pub const DHCP_POOL_ROLE: &str = "dhcp-pool";
/// Port a DHCP server binds.
pub const DHCP_SERVER_PORT: u16 = 67;

/// Transport protocol of a service binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// "Service S runs on device D, bound to these IP addresses."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    /// Name of the hosting device.
    pub device: String,
    pub protocol: Protocol,
    pub ports: Vec<u16>,
    /// IP address entities the service listens on.
    #[serde(default)]
    pub ip_addresses: Vec<EntityId>,
}

/// A device network interface and the IP address entities assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: EntityId,
    pub device: String,
    pub name: String,
    #[serde(default)]
    pub ip_addresses: Vec<EntityId>,
}

/// An IP address entity (`10.0.0.53/24`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: EntityId,
    pub address: IpNetwork,
}

impl IpAddress {
    /// Address without its prefix length.
    pub fn host(&self) -> IpAddr {
        self.address.ip()
    }
}

/// A CIDR block in the prefix hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefix {
    pub id: EntityId,
    pub prefix: IpNetwork,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parent: Option<EntityId>,
}

impl Prefix {
    pub fn network(&self) -> IpAddr {
        self.prefix.network()
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix.prefix()
    }

    pub fn family(&self) -> DhcpFamily {
        match self.prefix {
            IpNetwork::V4(_) => DhcpFamily::Dhcp4,
            IpNetwork::V6(_) => DhcpFamily::Dhcp6,
        }
    }

    /// `network/prefix_length`, with host bits cleared.
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network(), self.prefix_len())
    }
}

/// Kinds of typed edges the engine follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// DHCP service binding -> subnet prefix it serves.
    #[serde(rename = "dhcp_server_subnets")]
    ServerToSubnet,
    /// Gateway IP address -> subnet prefix.
    #[serde(rename = "subnet_gateway")]
    GatewayToSubnet,
    /// DNS server IP address -> subnet prefix.
    #[serde(rename = "subnet_dns_servers")]
    DnsToSubnet,
    /// NTP server IP address -> subnet prefix.
    #[serde(rename = "subnet_ntp_servers")]
    NtpToSubnet,
}

impl Relationship {
    pub const ALL: [Relationship; 4] = [
        Relationship::ServerToSubnet,
        Relationship::GatewayToSubnet,
        Relationship::DnsToSubnet,
        Relationship::NtpToSubnet,
    ];

    /// Stable key of the relationship in the inventory store.
    pub fn key(self) -> &'static str {
        match self {
            Relationship::ServerToSubnet => "dhcp_server_subnets",
            Relationship::GatewayToSubnet => "subnet_gateway",
            Relationship::DnsToSubnet => "subnet_dns_servers",
            Relationship::NtpToSubnet => "subnet_ntp_servers",
        }
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A directed edge `source -> destination` of one relationship kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub relationship: Relationship,
    pub source: EntityId,
    pub destination: EntityId,
}

/// Which side of an association a query pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Source(&'a str),
    Destination(&'a str),
}

/// Errors returned when loading or querying an inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse inventory file {path}: {source}")]
    ParseJson {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to parse inventory file {path}: {source}")]
    ParseToml {
        path: String,
        source: toml::de::Error,
    },
}

/// Read-only queries the engine issues against the source of truth.
///
/// Result order is the store's order and callers rely on it being stable.
pub trait Inventory {
    /// Service bindings using `protocol` whose ports include `port`.
    fn service_bindings(
        &self,
        protocol: Protocol,
        port: u16,
    ) -> Result<Vec<ServiceBinding>, InventoryError>;

    /// Interface an IP address entity is assigned to.
    fn interface_for_address(&self, address: &str) -> Result<Option<Interface>, InventoryError>;

    fn ip_address(&self, id: &str) -> Result<Option<IpAddress>, InventoryError>;

    fn prefix(&self, id: &str) -> Result<Option<Prefix>, InventoryError>;

    /// Whether the store defines this relationship kind at all.
    fn has_relationship(&self, relationship: Relationship) -> Result<bool, InventoryError>;

    fn associations(
        &self,
        relationship: Relationship,
        endpoint: Endpoint<'_>,
    ) -> Result<Vec<Association>, InventoryError>;

    /// Whether the store defines the named prefix role.
    fn has_role(&self, role: &str) -> Result<bool, InventoryError>;

    /// Direct children of `parent` carrying `role`.
    fn child_prefixes(&self, parent: &str, role: &str) -> Result<Vec<Prefix>, InventoryError>;
}
