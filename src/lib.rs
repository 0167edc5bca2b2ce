// Registrar - service registration and discovery for Consul and Eureka
//
// This library registers a running service with one or more registries, keeps
// Eureka leases alive in the background and looks up peer instances.

// Re-export the registry clients
pub use registrar_discovery::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use registrar_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AgentService,
        CatalogDeregistration,
        CatalogRegistration,
        ConsulCatalogClient,
        DiscoveryError,
        DiscoveryModule,
        EurekaClient,
        QueryOptions,
        RegistryClient,
        ServiceInstance,
        WriteOptions,
    };

    #[cfg(feature = "config")]
    pub use registrar_config::{ConfigEntry, DiscoveryConfig};
}
