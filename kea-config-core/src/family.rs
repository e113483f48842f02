use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// DHCP protocol family served by one Kea daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhcpFamily {
    /// DHCPv4 (`kea-dhcp4`).
    Dhcp4,
    /// DHCPv6 (`kea-dhcp6`).
    Dhcp6,
}

impl DhcpFamily {
    /// Both families, in processing order.
    pub const ALL: [DhcpFamily; 2] = [DhcpFamily::Dhcp4, DhcpFamily::Dhcp6];

    /// Map an IP version (4 or 6) to its family.
    pub fn from_ip_version(version: u8) -> Option<Self> {
        match version {
            4 => Some(Self::Dhcp4),
            6 => Some(Self::Dhcp6),
            _ => None,
        }
    }

    /// IP version number of the family.
    pub fn ip_version(self) -> u8 {
        match self {
            Self::Dhcp4 => 4,
            Self::Dhcp6 => 6,
        }
    }

    /// Service name used in control API `service` lists.
    pub fn service(self) -> &'static str {
        match self {
            Self::Dhcp4 => "dhcp4",
            Self::Dhcp6 => "dhcp6",
        }
    }

    /// Top-level key wrapping the daemon configuration.
    pub fn root_key(self) -> &'static str {
        match self {
            Self::Dhcp4 => "Dhcp4",
            Self::Dhcp6 => "Dhcp6",
        }
    }

    /// Key of the subnet list inside the daemon configuration.
    pub fn subnet_key(self) -> &'static str {
        match self {
            Self::Dhcp4 => "subnet4",
            Self::Dhcp6 => "subnet6",
        }
    }

    /// Canonical on-disk configuration file of a stock Kea install.
    pub fn default_config_path(self) -> &'static str {
        match self {
            Self::Dhcp4 => "/etc/kea/kea-dhcp4.conf",
            Self::Dhcp6 => "/etc/kea/kea-dhcp6.conf",
        }
    }
}

impl Display for DhcpFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.service())
    }
}
