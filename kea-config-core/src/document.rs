use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::family::DhcpFamily;

/// Key Kea attaches to `config-get` results to detect concurrent edits.
const HASH_KEY: &str = "hash";
const INTERFACES_CONFIG_KEY: &str = "interfaces-config";

/// Errors raised when a JSON value is not a usable Kea configuration document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The value (or its daemon section) was not a JSON object.
    #[error("expected a JSON object for {0}")]
    NotAnObject(String),
    /// The family root key (`Dhcp4`/`Dhcp6`) was absent.
    #[error("missing '{0}' section")]
    MissingRoot(&'static str),
    /// A typed section failed to (de)serialize.
    #[error("invalid '{section}' section: {source}")]
    Section {
        section: String,
        source: serde_json::Error,
    },
}

/// `interfaces-config` section of a daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfacesConfig {
    /// Interface names the daemon listens on.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Every other key (`dhcp-socket-type`, `re-detect`, ...), passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One `option-data` entry of a subnet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OptionData {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            extra: Map::new(),
        }
    }
}

/// One address pool of a subnet, as `"<first> - <last>"` or a CIDR.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub pool: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pool {
    pub fn new(pool: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            extra: Map::new(),
        }
    }
}

/// A `subnet4`/`subnet6` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: u32,
    pub subnet: String,
    #[serde(rename = "option-data", default)]
    pub option_data: Vec<OptionData>,
    #[serde(default)]
    pub pools: Vec<Pool>,
    /// Lifetimes, reservations, relay info and anything else the server carries.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subnet {
    pub fn new(
        id: u32,
        subnet: impl Into<String>,
        option_data: Vec<OptionData>,
        pools: Vec<Pool>,
    ) -> Self {
        Self {
            id,
            subnet: subnet.into(),
            option_data,
            pools,
            extra: Map::new(),
        }
    }

    /// Return the `data` of the named option, if present.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.option_data
            .iter()
            .find(|option| option.name == name)
            .map(|option| option.data.as_str())
    }
}

/// A Kea daemon configuration (`Dhcp4` or `Dhcp6` section).
///
/// The sections this crate rewrites (`interfaces-config` and the subnet list) are
/// typed; every other key is kept verbatim in [`ConfigDocument::extra`] so a
/// fetched document can be pushed back without losing server settings. The
/// integrity `hash` Kea reports alongside `config-get` results is dropped on
/// load: it no longer matches once the document is edited.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    pub family: DhcpFamily,
    pub interfaces_config: InterfacesConfig,
    pub subnets: Vec<Subnet>,
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// Create an empty document for `family`.
    pub fn new(family: DhcpFamily) -> Self {
        Self {
            family,
            interfaces_config: InterfacesConfig::default(),
            subnets: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Build a document from `config-get` style arguments (`{"Dhcp4": {...}, "hash": "..."}`).
    pub fn from_arguments(family: DhcpFamily, arguments: &Value) -> Result<Self, DocumentError> {
        let args = arguments
            .as_object()
            .ok_or_else(|| DocumentError::NotAnObject("arguments".to_string()))?;
        let root = args
            .get(family.root_key())
            .ok_or(DocumentError::MissingRoot(family.root_key()))?;
        Self::from_root(family, root)
    }

    /// Build a document from the daemon section itself (the value under `Dhcp4`/`Dhcp6`).
    pub fn from_root(family: DhcpFamily, root: &Value) -> Result<Self, DocumentError> {
        let mut extra = root
            .as_object()
            .cloned()
            .ok_or_else(|| DocumentError::NotAnObject(family.root_key().to_string()))?;
        extra.remove(HASH_KEY);

        let interfaces_config = match extra.remove(INTERFACES_CONFIG_KEY) {
            Some(value) => typed_section(INTERFACES_CONFIG_KEY, value)?,
            None => InterfacesConfig::default(),
        };
        let subnets = match extra.remove(family.subnet_key()) {
            Some(value) => typed_section(family.subnet_key(), value)?,
            None => Vec::new(),
        };

        Ok(Self {
            family,
            interfaces_config,
            subnets,
            extra,
        })
    }

    /// Serialize the daemon section (the value that goes under `Dhcp4`/`Dhcp6`).
    pub fn to_root(&self) -> Result<Value, DocumentError> {
        let mut root = self.extra.clone();
        root.insert(
            INTERFACES_CONFIG_KEY.to_string(),
            section_value(INTERFACES_CONFIG_KEY, &self.interfaces_config)?,
        );
        root.insert(
            self.family.subnet_key().to_string(),
            section_value(self.family.subnet_key(), &self.subnets)?,
        );
        Ok(Value::Object(root))
    }

    /// Serialize as `config-set` arguments (`{"Dhcp4": {...}}`).
    pub fn to_arguments(&self) -> Result<Value, DocumentError> {
        let mut args = Map::new();
        args.insert(self.family.root_key().to_string(), self.to_root()?);
        Ok(Value::Object(args))
    }

    /// Replace the listening interface list.
    pub fn set_interfaces<I, S>(&mut self, interfaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interfaces_config.interfaces = interfaces.into_iter().map(Into::into).collect();
    }

    /// Replace the whole subnet list, returning the previous one.
    pub fn replace_subnets(&mut self, subnets: Vec<Subnet>) -> Vec<Subnet> {
        std::mem::replace(&mut self.subnets, subnets)
    }
}

/// Array key -> element field used to match repeated entries when diffing Kea documents.
pub fn kea_key_fields() -> HashMap<String, String> {
    [
        ("subnet4", "subnet"),
        ("subnet6", "subnet"),
        ("option-data", "name"),
        ("pools", "pool"),
        ("reservations", "hw-address"),
        ("client-classes", "name"),
    ]
    .into_iter()
    .map(|(array, field)| (array.to_string(), field.to_string()))
    .collect()
}

fn typed_section<T: serde::de::DeserializeOwned>(
    section: &str,
    value: Value,
) -> Result<T, DocumentError> {
    serde_json::from_value(value).map_err(|source| DocumentError::Section {
        section: section.to_string(),
        source,
    })
}

fn section_value<T: Serialize>(section: &str, value: &T) -> Result<Value, DocumentError> {
    serde_json::to_value(value).map_err(|source| DocumentError::Section {
        section: section.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{ConfigDocument, OptionData, Pool, Subnet};
    use crate::family::DhcpFamily;

    #[test]
    fn drops_hash_and_keeps_unknown_keys() {
        let args = json!({
            "Dhcp4": {
                "interfaces-config": {"interfaces": ["eth1"], "dhcp-socket-type": "raw"},
                "subnet4": [{"id": 7, "subnet": "192.0.2.0/24", "valid-lifetime": 600}],
                "valid-lifetime": 4000,
                "hash": "inner"
            },
            "hash": "ABCDEF"
        });

        let doc = ConfigDocument::from_arguments(DhcpFamily::Dhcp4, &args).expect("document");
        assert_eq!(doc.interfaces_config.interfaces, vec!["eth1".to_string()]);
        assert_eq!(doc.subnets[0].id, 7);
        assert_eq!(doc.subnets[0].extra.get("valid-lifetime"), Some(&json!(600)));
        assert!(!doc.extra.contains_key("hash"));

        let out = doc.to_arguments().expect("serialize");
        assert!(out.get("hash").is_none());
        assert_eq!(out["Dhcp4"]["valid-lifetime"], json!(4000));
        assert_eq!(
            out["Dhcp4"]["interfaces-config"]["dhcp-socket-type"],
            json!("raw")
        );
        assert!(out["Dhcp4"].get("hash").is_none());
    }

    #[test]
    fn replacing_subnets_and_interfaces_shapes_output() {
        let mut doc = ConfigDocument::new(DhcpFamily::Dhcp6);
        doc.set_interfaces(["eth0", "eth1"]);
        let previous = doc.replace_subnets(vec![Subnet::new(
            3,
            "2001:db8::/64",
            vec![OptionData::new("dns-servers", "2001:db8::53")],
            vec![Pool::new("2001:db8::1 - 2001:db8::ffff")],
        )]);
        assert!(previous.is_empty());

        let root = doc.to_root().expect("serialize");
        assert_eq!(
            root,
            json!({
                "interfaces-config": {"interfaces": ["eth0", "eth1"]},
                "subnet6": [{
                    "id": 3,
                    "subnet": "2001:db8::/64",
                    "option-data": [{"name": "dns-servers", "data": "2001:db8::53"}],
                    "pools": [{"pool": "2001:db8::1 - 2001:db8::ffff"}]
                }]
            })
        );
    }

    #[test]
    fn missing_root_is_reported() {
        let err = ConfigDocument::from_arguments(DhcpFamily::Dhcp6, &json!({"Dhcp4": {}}))
            .expect_err("should fail");
        assert_eq!(err.to_string(), "missing 'Dhcp6' section");
    }
}
