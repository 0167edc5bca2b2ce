//! Wiring of every configured registry client

use crate::error::Result;
use crate::factory::{ConsulClientFactory, EurekaClientFactory};
use registrar_config::DiscoveryConfig;
use std::path::Path;
use tracing::info;

/// Every registry client of a discovery document, grouped by backend.
///
/// A section absent from the document has no factory. Construction is all or
/// nothing: one bad entry or one duplicate name fails the whole module.
#[derive(Debug, Default)]
pub struct DiscoveryModule {
    consul: Option<ConsulClientFactory>,
    eureka: Option<EurekaClientFactory>,
}

impl DiscoveryModule {
    /// Build clients from a discovery document
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use registrar_config::{ConfigEntry, DiscoveryConfig};
    /// use registrar_discovery::{DiscoveryModule, RegistryClient};
    ///
    /// let config = DiscoveryConfig::new()
    ///     .with_eureka(ConfigEntry::new().with("serviceUrl", "http://localhost:8761"));
    /// let module = DiscoveryModule::from_config(config)?;
    ///
    /// let eureka = module.eureka().unwrap().get_default_client()?;
    /// assert_eq!(eureka.name(), "eureka-netflix-1");
    /// ```
    pub fn from_config(config: DiscoveryConfig) -> Result<Self> {
        let config = config.normalize()?;

        let consul = config
            .consul
            .as_deref()
            .map(ConsulClientFactory::from_entries)
            .transpose()?;
        let eureka = config
            .eureka
            .as_deref()
            .map(EurekaClientFactory::from_entries)
            .transpose()?;

        info!(
            consul = consul.as_ref().map_or(0, |f| f.len()),
            eureka = eureka.as_ref().map_or(0, |f| f.len()),
            "Discovery clients configured"
        );

        Ok(Self { consul, eureka })
    }

    /// Load a JSON or TOML discovery document and build its clients
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(DiscoveryConfig::from_file(path)?)
    }

    pub fn consul(&self) -> Option<&ConsulClientFactory> {
        self.consul.as_ref()
    }

    pub fn eureka(&self) -> Option<&EurekaClientFactory> {
        self.eureka.as_ref()
    }

    /// Stop the heartbeat of every Eureka client
    pub fn shutdown(&self) {
        for client in self.eureka.iter().flat_map(|f| f.get_all_clients()) {
            client.shutdown();
        }
    }
}
