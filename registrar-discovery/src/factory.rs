//! Named client lookup

use crate::client::RegistryClient;
use crate::connection::ConnectionConfig;
use crate::consul::ConsulCatalogClient;
use crate::error::{DiscoveryError, Result};
use crate::eureka::EurekaClient;
use registrar_config::{ConfigEntry, ConfigValidator};
use std::sync::Arc;
use tracing::debug;

/// Factory of the configured Consul clients
pub type ConsulClientFactory = RegistryClientFactory<ConsulCatalogClient>;

/// Factory of the configured Eureka clients
pub type EurekaClientFactory = RegistryClientFactory<EurekaClient>;

/// Clients of one backend family, in configuration order.
///
/// The default client is the first one configured.
pub struct RegistryClientFactory<C: RegistryClient> {
    clients: Vec<(String, Arc<C>)>,
}

impl<C: RegistryClient> RegistryClientFactory<C> {
    /// Wrap already constructed clients. Names must be unique.
    pub fn new(clients: Vec<C>) -> Result<Self> {
        ConfigValidator::unique_names(clients.iter().map(|c| c.name()))?;

        Ok(Self {
            clients: clients
                .into_iter()
                .map(|client| (client.name().to_string(), Arc::new(client)))
                .collect(),
        })
    }

    /// Build one client per entry.
    ///
    /// Entries without a `name` are named by position (`eureka-netflix-1`,
    /// `eureka-netflix-2`, ...). Any invalid entry or duplicate name fails the whole
    /// batch before a client is returned.
    pub fn from_entries(entries: &[ConfigEntry]) -> Result<Self> {
        let kind = C::kind();
        let mut configs = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let mut config = ConnectionConfig::from_entry(entry, kind)?;
            if entry.name().is_none() {
                config.name = kind.default_name(index + 1);
            }
            configs.push(config);
        }

        ConfigValidator::unique_names(configs.iter().map(|c| c.name.as_str()))?;

        let clients = configs
            .into_iter()
            .map(|config| {
                debug!(client = %config.name, backend = %kind, "Creating registry client");
                C::connect(config)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(clients)
    }

    /// Client registered under `name`
    pub fn get_client(&self, name: &str) -> Result<Arc<C>> {
        self.clients
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, client)| client.clone())
            .ok_or_else(|| DiscoveryError::ClientNotFound(name.to_string()))
    }

    /// First configured client
    pub fn get_default_client(&self) -> Result<Arc<C>> {
        self.clients
            .first()
            .map(|(_, client)| client.clone())
            .ok_or_else(|| {
                DiscoveryError::ClientNotFound(format!("no {} client configured", C::kind()))
            })
    }

    pub fn get_all_clients(&self) -> Vec<Arc<C>> {
        self.clients.iter().map(|(_, client)| client.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.clients.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl<C: RegistryClient> std::fmt::Debug for RegistryClientFactory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClientFactory")
            .field("kind", &C::kind())
            .field("clients", &self.names())
            .finish()
    }
}
