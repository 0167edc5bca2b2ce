//! Service registration and discovery against Consul and Eureka
//!
//! This crate registers a running service with a registry, keeps the
//! registration alive and looks up peers.
//!
//! ## Features
//!
//! - **Consul catalog** - register, deregister and query the `/v1/catalog` API
//! - **Eureka** - register, heartbeat, deregister and look up instances
//! - **Lease renewal** - a background heartbeat for every Eureka registration
//! - **Named clients** - any number of clients per backend, built from one
//!   discovery document
//!
//! ## Quick Start
//!
//! ### Eureka
//!
//! ```rust,ignore
//! use registrar_config::ConfigEntry;
//! use registrar_discovery::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let eureka = EurekaClient::from_entry(
//!         &ConfigEntry::new()
//!             .with("serviceUrl", "http://localhost:8761")
//!             .with("credentials", "user:secret"),
//!     )?;
//!
//!     let instance = ServiceInstance::new("ORDERS", "orders-1")
//!         .with_host_name("10.0.0.5")
//!         .with_ip_addr("10.0.0.5")
//!         .with_port(8080);
//!
//!     // Renewed every 90 seconds from now on
//!     eureka.register(&instance).await?;
//!
//!     for peer in eureka.find_service("PAYMENTS").await {
//!         println!("Found: {}", peer.id());
//!     }
//!
//!     eureka.deregister(&instance).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Consul
//!
//! ```rust,ignore
//! use registrar_config::ConfigEntry;
//! use registrar_discovery::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let consul = ConsulCatalogClient::from_entry(
//!         &ConfigEntry::new().with("serviceUrl", "http://localhost:8500"),
//!     )?;
//!
//!     let registration = CatalogRegistration::new("node-1", "10.0.0.5")
//!         .with_service(AgentService::new("orders-1", "orders", 8080).with_tag("v1"));
//!     consul.register(&registration).await?;
//!
//!     let nodes = consul.get_nodes_for_service("orders", &["v1"], None).await?;
//!     println!("{} instances at index {}", nodes.value.len(), nodes.meta.last_index);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### From a discovery document
//!
//! ```rust,ignore
//! use registrar_discovery::*;
//!
//! let module = DiscoveryModule::from_file("discovery.toml")?;
//! let eureka = module.eureka().unwrap().get_client("primary")?;
//! ```

pub mod client;
pub mod connection;
pub mod consul;
pub mod credentials;
pub mod error;
pub mod eureka;
pub mod factory;
pub mod heartbeat;
pub mod instance;
pub mod module;
mod transport;

pub use client::RegistryClient;
pub use connection::{BackendKind, ConnectionConfig, ConsulSettings, DEFAULT_HEARTBEAT_INTERVAL};
pub use consul::{
    AgentService, CatalogDeregistration, CatalogNode, CatalogNodeServiceList, CatalogRegistration,
    CatalogService, CompoundServiceName, Consistency, ConsulCatalogClient, GatewayService,
    HealthCheck, Node, QueryMeta, QueryOptions, QueryResponse, WriteMeta, WriteOptions,
};
pub use credentials::{CredentialResolver, DEFAULT_AUTH_TYPE};
pub use error::{DiscoveryError, Result};
pub use eureka::EurekaClient;
pub use factory::{ConsulClientFactory, EurekaClientFactory, RegistryClientFactory};
pub use heartbeat::{HeartbeatScheduler, SchedulerState};
pub use instance::{
    DataCenterInfo, DataCenterName, InstanceStatus, LeaseInfo, PortInfo, ServiceInstance,
};
pub use module::DiscoveryModule;
