use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    Association, Endpoint, Interface, Inventory, InventoryError, IpAddress, Prefix, Protocol,
    Relationship, ServiceBinding, DHCP_POOL_ROLE,
};

/// Point-in-time export of the inventory, held in memory.
///
/// Loaded from JSON, or from TOML when the file name ends in `.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    #[serde(default = "default_relationships")]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub services: Vec<ServiceBinding>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
    #[serde(default)]
    pub prefixes: Vec<Prefix>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            roles: default_roles(),
            relationships: default_relationships(),
            services: Vec::new(),
            interfaces: Vec::new(),
            ip_addresses: Vec::new(),
            prefixes: Vec::new(),
            associations: Vec::new(),
        }
    }
}

fn default_roles() -> Vec<String> {
    vec![DHCP_POOL_ROLE.to_string()]
}

fn default_relationships() -> Vec<Relationship> {
    Relationship::ALL.to_vec()
}

impl Snapshot {
    /// Load a snapshot file.
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        let raw = fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&raw, path.display().to_string())
        } else {
            Self::from_json_str(&raw, path.display().to_string())
        }
    }

    pub fn from_json_str(raw: &str, path: String) -> Result<Self, InventoryError> {
        serde_json::from_str(raw).map_err(|source| InventoryError::ParseJson { path, source })
    }

    pub fn from_toml_str(raw: &str, path: String) -> Result<Self, InventoryError> {
        toml::from_str(raw).map_err(|source| InventoryError::ParseToml { path, source })
    }
}

impl Inventory for Snapshot {
    fn service_bindings(
        &self,
        protocol: Protocol,
        port: u16,
    ) -> Result<Vec<ServiceBinding>, InventoryError> {
        Ok(self
            .services
            .iter()
            .filter(|s| s.protocol == protocol && s.ports.contains(&port))
            .cloned()
            .collect())
    }

    fn interface_for_address(&self, address: &str) -> Result<Option<Interface>, InventoryError> {
        Ok(self
            .interfaces
            .iter()
            .find(|iface| iface.ip_addresses.iter().any(|id| id == address))
            .cloned())
    }

    fn ip_address(&self, id: &str) -> Result<Option<IpAddress>, InventoryError> {
        Ok(self.ip_addresses.iter().find(|ip| ip.id == id).cloned())
    }

    fn prefix(&self, id: &str) -> Result<Option<Prefix>, InventoryError> {
        Ok(self.prefixes.iter().find(|p| p.id == id).cloned())
    }

    fn has_relationship(&self, relationship: Relationship) -> Result<bool, InventoryError> {
        Ok(self.relationships.contains(&relationship))
    }

    fn associations(
        &self,
        relationship: Relationship,
        endpoint: Endpoint<'_>,
    ) -> Result<Vec<Association>, InventoryError> {
        Ok(self
            .associations
            .iter()
            .filter(|a| a.relationship == relationship)
            .filter(|a| match endpoint {
                Endpoint::Source(id) => a.source == id,
                Endpoint::Destination(id) => a.destination == id,
            })
            .cloned()
            .collect())
    }

    fn has_role(&self, role: &str) -> Result<bool, InventoryError> {
        Ok(self.roles.iter().any(|r| r == role))
    }

    fn child_prefixes(&self, parent: &str, role: &str) -> Result<Vec<Prefix>, InventoryError> {
        Ok(self
            .prefixes
            .iter()
            .filter(|p| p.parent.as_deref() == Some(parent) && p.role.as_deref() == Some(role))
            .cloned()
            .collect())
    }
}
