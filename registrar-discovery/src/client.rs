//! Registry client abstraction

use crate::connection::{BackendKind, ConnectionConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Common surface of the registry backends.
///
/// Only construction, identity and the two lifecycle writes are shared.
/// Lookups, heartbeats and option-taking variants are inherent methods of
/// each client since their contracts differ between backends.
#[async_trait]
pub trait RegistryClient: Send + Sync + 'static {
    /// What `register` announces
    type Registration: Send + Sync;

    /// What `deregister` removes
    type Deregistration: Send + Sync;

    /// Backend family this client speaks to
    fn kind() -> BackendKind
    where
        Self: Sized;

    /// Build a client from validated connection settings
    fn connect(config: ConnectionConfig) -> Result<Self>
    where
        Self: Sized;

    fn config(&self) -> &ConnectionConfig;

    /// Client name, unique within a [`DiscoveryModule`](crate::DiscoveryModule)
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Announce a registration to the backend
    async fn register(&self, registration: &Self::Registration) -> Result<()>;

    /// Remove a registration from the backend
    async fn deregister(&self, deregistration: &Self::Deregistration) -> Result<()>;
}
