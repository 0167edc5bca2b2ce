//! Connection settings derived from a configuration entry.

use crate::credentials::{CredentialResolver, DEFAULT_AUTH_TYPE, read_secret_file};
use crate::error::{DiscoveryError, Result};
use registrar_config::{ConfigEntry, ConfigValidator};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Heartbeat period used by Eureka clients unless overridden
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(90);

/// Registry backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Consul catalog API
    Consul,
    /// Eureka v2 REST API
    Eureka,
}

impl BackendKind {
    /// Configuration section key
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Consul => registrar_config::CONSUL_SECTION,
            BackendKind::Eureka => registrar_config::EUREKA_SECTION,
        }
    }

    /// Prefix of the positional default name
    pub fn name_prefix(&self) -> &'static str {
        match self {
            BackendKind::Consul => registrar_config::CONSUL_NAME_PREFIX,
            BackendKind::Eureka => registrar_config::EUREKA_NAME_PREFIX,
        }
    }

    /// Positional default name, `position` is 1-based
    pub fn default_name(&self, position: usize) -> String {
        format!("{}-{}", self.name_prefix(), position)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consul-only settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsulSettings {
    /// Default datacenter for reads and writes
    pub datacenter: Option<String>,
    /// Default blocking-query wait
    pub wait_time: Option<Duration>,
    /// ACL token, inline or read from `consulTokenFile`
    pub token: Option<String>,
    /// PEM bundle of extra trusted roots
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate
    pub cert_file: Option<PathBuf>,
    /// PEM client key
    pub key_file: Option<PathBuf>,
}

/// Validated, immutable connection parameters of one registry client
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Client name
    pub name: String,
    /// Backend family
    pub kind: BackendKind,
    /// Registry base URL
    pub service_url: Url,
    /// Skip TLS certificate verification
    pub ignore_ssl: bool,
    /// Request timeout, `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// Auth scheme name
    pub auth_type: String,
    /// Resolved `Authorization` header value
    pub authorization: Option<String>,
    /// Eureka lease renewal period
    pub heartbeat_interval: Duration,
    /// Consul extras, empty for Eureka
    pub consul: ConsulSettings,
}

impl ConnectionConfig {
    /// Build from a configuration entry, failing fast on missing or invalid fields.
    ///
    /// Credential and token files are read here, once.
    pub fn from_entry(entry: &ConfigEntry, kind: BackendKind) -> Result<Self> {
        let raw_url = entry.require_str("serviceUrl")?;
        ConfigValidator::is_url(&raw_url, "serviceUrl")?;
        let service_url = Url::parse(&raw_url).map_err(|e| {
            DiscoveryError::Configuration(format!("invalid serviceUrl '{}': {}", raw_url, e))
        })?;
        if service_url.cannot_be_a_base() {
            return Err(DiscoveryError::Configuration(format!(
                "serviceUrl '{}' cannot be used as a base URL",
                raw_url
            )));
        }

        let timeout = entry
            .get_u64("timeout")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let heartbeat_interval = entry
            .get_u64("heartbeatIntervalSecs")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);

        let consul = match kind {
            BackendKind::Consul => consul_settings(entry)?,
            BackendKind::Eureka => ConsulSettings::default(),
        };

        Ok(Self {
            name: entry.name().unwrap_or_else(|| kind.default_name(1)),
            kind,
            service_url,
            ignore_ssl: entry.get_bool("ignoreSsl").unwrap_or(false),
            timeout,
            auth_type: entry
                .get_str("authType")
                .unwrap_or_else(|| DEFAULT_AUTH_TYPE.to_string()),
            authorization: CredentialResolver::resolve(entry)?,
            heartbeat_interval,
            consul,
        })
    }
}

fn consul_settings(entry: &ConfigEntry) -> Result<ConsulSettings> {
    let token = match (entry.get_str("consulToken"), entry.get_str("consulTokenFile")) {
        (Some(token), _) => Some(token),
        (None, Some(file)) => Some(read_secret_file(&file, "consulTokenFile")?),
        (None, None) => None,
    };

    let ca_file = existing_path(entry, "caFile")?;
    let cert_file = existing_path(entry, "certFile")?;
    let key_file = existing_path(entry, "keyFile")?;
    if cert_file.is_some() != key_file.is_some() {
        return Err(DiscoveryError::Configuration(
            "certFile and keyFile must be configured together".to_string(),
        ));
    }

    Ok(ConsulSettings {
        datacenter: entry.get_str("dataCenter"),
        wait_time: entry
            .get_u64("waitTimeSecs")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
        token: token.filter(|t| !t.is_empty()),
        ca_file,
        cert_file,
        key_file,
    })
}

fn existing_path(entry: &ConfigEntry, key: &str) -> Result<Option<PathBuf>> {
    match entry.get_str(key) {
        None => Ok(None),
        Some(path) => {
            let path = PathBuf::from(path);
            if path.exists() {
                Ok(Some(path))
            } else {
                Err(DiscoveryError::Configuration(format!(
                    "Could not find file '{}' configured as {}",
                    path.display(),
                    key
                )))
            }
        }
    }
}
