//! Consul catalog API types
//!
//! Field names follow the Consul HTTP API (`PascalCase`). Every response
//! field defaults, so partially populated answers from older agents decode.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Consul sends `null` for empty lists and maps
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// A service as stored on a catalog node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,

    pub service: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(deserialize_with = "null_default")]
    pub tags: Vec<String>,

    #[serde(deserialize_with = "null_default")]
    pub meta: HashMap<String, String>,

    pub port: u16,

    pub address: String,

    pub enable_tag_override: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl AgentService {
    pub fn new(id: impl Into<String>, service: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// A health check attached to a registration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthCheck {
    pub node: String,

    #[serde(rename = "CheckID")]
    pub check_id: String,

    pub name: String,

    /// `passing`, `warning` or `critical`
    pub status: String,

    pub notes: String,

    pub output: String,

    #[serde(rename = "ServiceID")]
    pub service_id: String,

    pub service_name: String,
}

/// Low-level catalog write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogRegistration {
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub node: String,

    pub address: String,

    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_default")]
    pub tagged_addresses: HashMap<String, String>,

    #[serde(skip_serializing_if = "HashMap::is_empty", deserialize_with = "null_default")]
    pub node_meta: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<AgentService>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<HealthCheck>,

    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_default")]
    pub checks: Vec<HealthCheck>,

    pub skip_node_update: bool,
}

impl CatalogRegistration {
    pub fn new(node: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, service: AgentService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_check(mut self, check: HealthCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    /// Identity used in log lines
    pub fn describe(&self) -> String {
        let service = self.service.as_ref().map(|s| s.id.as_str()).unwrap_or("");
        format!("{} {}", self.id.as_deref().unwrap_or(service), self.node)
    }
}

/// Low-level catalog removal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogDeregistration {
    pub node: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    #[serde(rename = "ServiceID", skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(rename = "CheckID", skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,
}

impl CatalogDeregistration {
    /// Remove the whole node
    pub fn node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Default::default()
        }
    }

    /// Remove one service from a node
    pub fn service(node: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            service_id: Some(service_id.into()),
            ..Default::default()
        }
    }
}

/// A catalog node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: String,

    pub node: String,

    pub address: String,

    pub datacenter: String,

    #[serde(deserialize_with = "null_default")]
    pub tagged_addresses: HashMap<String, String>,

    #[serde(deserialize_with = "null_default")]
    pub meta: HashMap<String, String>,

    pub create_index: u64,

    pub modify_index: u64,
}

/// One node providing a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogService {
    #[serde(rename = "ID")]
    pub id: String,

    pub node: String,

    pub address: String,

    pub datacenter: String,

    #[serde(deserialize_with = "null_default")]
    pub tagged_addresses: HashMap<String, String>,

    #[serde(deserialize_with = "null_default")]
    pub node_meta: HashMap<String, String>,

    #[serde(rename = "ServiceID")]
    pub service_id: String,

    pub service_name: String,

    pub service_address: String,

    #[serde(deserialize_with = "null_default")]
    pub service_tags: Vec<String>,

    #[serde(deserialize_with = "null_default")]
    pub service_meta: HashMap<String, String>,

    pub service_port: u16,

    pub service_enable_tag_override: bool,

    pub create_index: u64,

    pub modify_index: u64,
}

/// A node with its services keyed by service ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogNode {
    pub node: Option<Node>,

    #[serde(deserialize_with = "null_default")]
    pub services: HashMap<String, AgentService>,
}

/// A node with its services as a list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogNodeServiceList {
    pub node: Option<Node>,

    #[serde(deserialize_with = "null_default")]
    pub services: Vec<AgentService>,
}

/// Service name qualified by namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompoundServiceName {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A service linked to an ingress or terminating gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayService {
    pub gateway: CompoundServiceName,

    pub service: CompoundServiceName,

    pub gateway_kind: String,

    pub port: u16,

    pub protocol: String,

    #[serde(deserialize_with = "null_default")]
    pub hosts: Vec<String>,

    #[serde(rename = "CAFile")]
    pub ca_file: String,

    pub cert_file: String,

    pub key_file: String,

    #[serde(rename = "SNI")]
    pub sni: String,

    pub from_wildcard: bool,
}

/// Read consistency mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Consistency {
    /// Leader-served, may be slightly stale after a leader change
    #[default]
    Default,
    /// Leader-verified reads
    Consistent,
    /// Any server may answer
    Stale,
}

/// Per-call read options. Unset fields fall back to the client's settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub datacenter: Option<String>,
    pub wait_time: Option<Duration>,
    pub wait_index: Option<u64>,
    pub token: Option<String>,
    pub consistency: Consistency,
    pub near: Option<String>,
    pub filter: Option<String>,
    pub node_meta: Vec<(String, String)>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    /// Blocking query: wait up to `wait_time` for a change past `index`
    pub fn blocking(mut self, index: u64, wait_time: Duration) -> Self {
        self.wait_index = Some(index);
        self.wait_time = Some(wait_time);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn near(mut self, near: impl Into<String>) -> Self {
        self.near = Some(near.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn node_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.node_meta.push((key.into(), value.into()));
        self
    }
}

/// Per-call write options. Unset fields fall back to the client's settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    pub datacenter: Option<String>,
    pub token: Option<String>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Metadata returned with every read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMeta {
    /// `X-Consul-Index`, feed into [`QueryOptions::blocking`]
    pub last_index: u64,
    /// Time since the answering server last heard from the leader
    pub last_contact: Duration,
    pub known_leader: bool,
    pub request_time: Duration,
}

/// Metadata returned with every write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteMeta {
    pub request_time: Duration,
}

/// A decoded read together with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse<T> {
    pub value: T,
    pub meta: QueryMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registration_wire_format() {
        let registration = CatalogRegistration::new("node-1", "10.0.0.7")
            .with_datacenter("dc1")
            .with_service(
                AgentService::new("api-1", "api", 8080)
                    .with_tag("v1")
                    .with_meta("version", "1.0.0"),
            );
        let value = serde_json::to_value(&registration).unwrap();

        assert_eq!(value["Node"], "node-1");
        assert_eq!(value["Address"], "10.0.0.7");
        assert_eq!(value["Datacenter"], "dc1");
        assert_eq!(value["Service"]["ID"], "api-1");
        assert_eq!(value["Service"]["Tags"], json!(["v1"]));
        assert!(value.get("ID").is_none());
        assert!(value.get("Checks").is_none());
        assert_eq!(registration.describe(), "api-1 node-1");
    }

    #[test]
    fn test_deregistration_wire_format() {
        let value = serde_json::to_value(CatalogDeregistration::service("node-1", "api-1")).unwrap();
        assert_eq!(value, json!({"Node": "node-1", "ServiceID": "api-1"}));
    }

    #[test]
    fn test_partial_catalog_service() {
        let service: CatalogService = serde_json::from_value(json!({
            "Node": "node-1",
            "ServiceID": "api-1",
            "ServiceName": "api",
            "ServicePort": 8080,
            "ServiceTags": null,
            "TaggedAddresses": null
        }))
        .unwrap();

        assert_eq!(service.node, "node-1");
        assert_eq!(service.service_port, 8080);
        assert!(service.service_tags.is_empty());
        assert!(service.tagged_addresses.is_empty());
    }
}
