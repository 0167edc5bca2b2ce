//! Eureka service instance model

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

const DEFAULT_DATA_CENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";
const EMPTY_METADATA_CLASS: &str = "java.util.Collections$EmptyMap";
const CLASS_KEY: &str = "@class";

/// Instance status as understood by Eureka
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    #[default]
    Up,
    Down,
    Starting,
    OutOfService,
    Unknown,
}

/// A port number together with its enabled flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    #[serde(rename = "$", deserialize_with = "lenient::port")]
    pub port: u16,

    #[serde(
        rename = "@enabled",
        serialize_with = "lenient::serialize_flag",
        deserialize_with = "lenient::flag"
    )]
    pub enabled: bool,
}

impl PortInfo {
    pub fn new(port: u16, enabled: bool) -> Self {
        Self { port, enabled }
    }

    pub fn enabled(port: u16) -> Self {
        Self::new(port, true)
    }
}

/// Data center flavours Eureka knows about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataCenterName {
    #[default]
    MyOwn,
    Amazon,
    Netflix,
}

/// Where the instance runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCenterInfo {
    #[serde(rename = "@class", default = "default_data_center_class")]
    pub class: String,

    pub name: DataCenterName,

    /// Cloud metadata, only reported for `Amazon`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl DataCenterInfo {
    pub fn new(name: DataCenterName) -> Self {
        Self {
            class: default_data_center_class(),
            name,
            metadata: None,
        }
    }
}

impl Default for DataCenterInfo {
    fn default() -> Self {
        Self::new(DataCenterName::MyOwn)
    }
}

fn default_data_center_class() -> String {
    DEFAULT_DATA_CENTER_CLASS.to_string()
}

/// Lease timing. The timestamps are filled in by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
    #[serde(default = "default_renewal_interval")]
    pub renewal_interval_in_secs: u32,

    #[serde(default = "default_duration")]
    pub duration_in_secs: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_timestamp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_renewal_timestamp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eviction_timestamp: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_up_timestamp: Option<u64>,
}

impl LeaseInfo {
    pub fn new(renewal_interval_in_secs: u32, duration_in_secs: u32) -> Self {
        Self {
            renewal_interval_in_secs,
            duration_in_secs,
            registration_timestamp: None,
            last_renewal_timestamp: None,
            eviction_timestamp: None,
            service_up_timestamp: None,
        }
    }
}

impl Default for LeaseInfo {
    fn default() -> Self {
        Self::new(default_renewal_interval(), default_duration())
    }
}

fn default_renewal_interval() -> u32 {
    30
}

fn default_duration() -> u32 {
    90
}

fn default_overridden_status() -> InstanceStatus {
    InstanceStatus::Unknown
}

fn default_country_id() -> u32 {
    1
}

/// One network-addressable endpoint registered with Eureka.
///
/// `app` and `instance_id` form the identity of the instance and cannot be
/// changed after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    instance_id: String,

    #[serde(default)]
    host_name: String,

    app: String,

    #[serde(default)]
    ip_addr: String,

    #[serde(default)]
    status: InstanceStatus,

    #[serde(
        rename = "overriddenstatus",
        alias = "overriddenStatus",
        default = "default_overridden_status"
    )]
    overridden_status: InstanceStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<PortInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    secure_port: Option<PortInfo>,

    #[serde(default = "default_country_id", deserialize_with = "lenient::country")]
    country_id: u32,

    #[serde(default)]
    data_center_info: DataCenterInfo,

    #[serde(default)]
    home_page_url: String,

    #[serde(default)]
    status_page_url: String,

    #[serde(default)]
    health_check_url: String,

    #[serde(default)]
    vip_address: String,

    #[serde(default)]
    secure_vip_address: String,

    #[serde(default, with = "metadata")]
    metadata: Map<String, Value>,

    #[serde(default)]
    lease_info: LeaseInfo,
}

impl ServiceInstance {
    /// Create a new instance of `app`
    pub fn new(app: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            host_name: String::new(),
            app: app.into(),
            ip_addr: String::new(),
            status: InstanceStatus::Up,
            overridden_status: InstanceStatus::Unknown,
            port: None,
            secure_port: None,
            country_id: default_country_id(),
            data_center_info: DataCenterInfo::default(),
            home_page_url: String::new(),
            status_page_url: String::new(),
            health_check_url: String::new(),
            vip_address: String::new(),
            secure_vip_address: String::new(),
            metadata: Map::new(),
            lease_info: LeaseInfo::default(),
        }
    }

    /// Identity key, `app->instanceId`
    pub fn id(&self) -> String {
        format!("{}->{}", self.app, self.instance_id)
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn set_host_name(&mut self, host_name: impl Into<String>) {
        self.host_name = host_name.into();
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.set_host_name(host_name);
        self
    }

    pub fn ip_addr(&self) -> &str {
        &self.ip_addr
    }

    pub fn set_ip_addr(&mut self, ip_addr: impl Into<String>) {
        self.ip_addr = ip_addr.into();
    }

    pub fn with_ip_addr(mut self, ip_addr: impl Into<String>) -> Self {
        self.set_ip_addr(ip_addr);
        self
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn set_status(&mut self, status: InstanceStatus) {
        self.status = status;
    }

    pub fn with_status(mut self, status: InstanceStatus) -> Self {
        self.set_status(status);
        self
    }

    pub fn overridden_status(&self) -> InstanceStatus {
        self.overridden_status
    }

    pub fn set_overridden_status(&mut self, status: InstanceStatus) {
        self.overridden_status = status;
    }

    pub fn port(&self) -> Option<PortInfo> {
        self.port
    }

    pub fn set_port(&mut self, port: u16, enabled: bool) {
        self.port = Some(PortInfo::new(port, enabled));
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.set_port(port, true);
        self
    }

    pub fn secure_port(&self) -> Option<PortInfo> {
        self.secure_port
    }

    pub fn set_secure_port(&mut self, port: u16, enabled: bool) {
        self.secure_port = Some(PortInfo::new(port, enabled));
    }

    pub fn with_secure_port(mut self, port: u16) -> Self {
        self.set_secure_port(port, true);
        self
    }

    pub fn country_id(&self) -> u32 {
        self.country_id
    }

    pub fn set_country_id(&mut self, country_id: u32) {
        self.country_id = country_id;
    }

    pub fn data_center_info(&self) -> &DataCenterInfo {
        &self.data_center_info
    }

    pub fn set_data_center_info(&mut self, info: DataCenterInfo) {
        self.data_center_info = info;
    }

    pub fn home_page_url(&self) -> &str {
        &self.home_page_url
    }

    pub fn set_home_page_url(&mut self, url: impl Into<String>) {
        self.home_page_url = url.into();
    }

    pub fn status_page_url(&self) -> &str {
        &self.status_page_url
    }

    pub fn set_status_page_url(&mut self, url: impl Into<String>) {
        self.status_page_url = url.into();
    }

    pub fn health_check_url(&self) -> &str {
        &self.health_check_url
    }

    pub fn set_health_check_url(&mut self, url: impl Into<String>) {
        self.health_check_url = url.into();
    }

    pub fn with_health_check_url(mut self, url: impl Into<String>) -> Self {
        self.set_health_check_url(url);
        self
    }

    pub fn vip_address(&self) -> &str {
        &self.vip_address
    }

    pub fn set_vip_address(&mut self, vip: impl Into<String>) {
        self.vip_address = vip.into();
    }

    pub fn with_vip_address(mut self, vip: impl Into<String>) -> Self {
        self.set_vip_address(vip);
        self
    }

    pub fn secure_vip_address(&self) -> &str {
        &self.secure_vip_address
    }

    pub fn set_secure_vip_address(&mut self, vip: impl Into<String>) {
        self.secure_vip_address = vip.into();
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: Map<String, Value>) {
        self.metadata = metadata;
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_metadata(key, value);
        self
    }

    pub fn lease_info(&self) -> &LeaseInfo {
        &self.lease_info
    }

    pub fn set_lease_info(&mut self, lease_info: LeaseInfo) {
        self.lease_info = lease_info;
    }
}

/// Eureka encodes an empty metadata map as a Java class marker.
mod metadata {
    use super::{CLASS_KEY, EMPTY_METADATA_CLASS};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    pub fn serialize<S: Serializer>(map: &Map<String, Value>, s: S) -> Result<S::Ok, S::Error> {
        if map.is_empty() {
            let mut marker = Map::new();
            marker.insert(CLASS_KEY.to_string(), Value::from(EMPTY_METADATA_CLASS));
            marker.serialize(s)
        } else {
            map.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
        let mut map = Option::<Map<String, Value>>::deserialize(d)?.unwrap_or_default();
        map.remove(CLASS_KEY);
        Ok(map)
    }
}

/// Eureka servers emit numbers and booleans as strings in several places.
mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Int(u64),
        Text(String),
    }

    fn number<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Scalar::deserialize(d)? {
            Scalar::Int(n) => Ok(n),
            Scalar::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Scalar::Bool(b) => Err(serde::de::Error::custom(format!(
                "expected a number, found {}",
                b
            ))),
        }
    }

    pub fn port<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
        u16::try_from(number(d)?).map_err(serde::de::Error::custom)
    }

    pub fn country<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        u32::try_from(number(d)?).map_err(serde::de::Error::custom)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Scalar::deserialize(d)? {
            Scalar::Bool(b) => Ok(b),
            Scalar::Int(n) => Ok(n != 0),
            Scalar::Text(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
        }
    }

    pub fn serialize_flag<S: Serializer>(flag: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *flag { "true" } else { "false" })
    }
}
