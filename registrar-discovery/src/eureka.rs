//! Eureka REST registry client

use crate::client::RegistryClient;
use crate::connection::{BackendKind, ConnectionConfig};
use crate::error::{DiscoveryError, Result};
use crate::heartbeat::HeartbeatScheduler;
use crate::instance::ServiceInstance;
use crate::transport;
use async_trait::async_trait;
use registrar_config::ConfigEntry;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use url::Url;

const APPS_PATH: [&str; 3] = ["eureka", "v2", "apps"];

/// Eureka registry client.
///
/// Registration and lookup never fail a caller because the registry is
/// unhappy: non-success statuses are logged and turned into benign results.
/// Deregistration is strict.
///
/// The first accepted registration starts a heartbeat timer that renews the
/// lease of every instance registered through this client. The timer stops
/// on [`shutdown`](EurekaClient::shutdown) or when the client is dropped. A
/// tick already in flight when an instance is deregistered may still renew
/// it once.
pub struct EurekaClient {
    inner: Arc<Inner>,
    heartbeat: HeartbeatScheduler,
}

struct Inner {
    config: ConnectionConfig,
    http: reqwest::Client,
    registered: RwLock<BTreeMap<String, ServiceInstance>>,
}

#[derive(Deserialize)]
struct ApplicationEnvelope {
    application: Option<Application>,
}

/// Entries are decoded one by one so a malformed instance only drops itself
#[derive(Deserialize)]
struct Application {
    instance: Option<OneOrMany<Value>>,
}

#[derive(Deserialize)]
struct InstanceEnvelope {
    instance: Option<ServiceInstance>,
}

/// A single-instance application may be reported as an object
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

impl EurekaClient {
    /// Create a client from validated connection settings
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let http = transport::build_client(&config)?;
        let heartbeat = HeartbeatScheduler::new(config.heartbeat_interval);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http,
                registered: RwLock::new(BTreeMap::new()),
            }),
            heartbeat,
        })
    }

    /// Create a client straight from a configuration entry
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use registrar_config::ConfigEntry;
    /// use registrar_discovery::EurekaClient;
    ///
    /// let eureka = EurekaClient::from_entry(
    ///     &ConfigEntry::new().with("serviceUrl", "http://localhost:8761"),
    /// )?;
    /// ```
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self> {
        Self::new(ConnectionConfig::from_entry(entry, BackendKind::Eureka)?)
    }

    /// Renew the lease of one instance.
    ///
    /// A non-200 answer is logged only; a transport failure is an error.
    pub async fn heartbeat(&self, instance: &ServiceInstance) -> Result<()> {
        self.inner.heartbeat(instance).await
    }

    /// Remove `app`/`instance_id` from the registry.
    ///
    /// Any status other than 200 is a [`DiscoveryError::Registry`]. Transport
    /// failures come back unwrapped as [`DiscoveryError::Http`].
    pub async fn deregister2(&self, app: &str, instance_id: &str) -> Result<()> {
        info!("De-registering service ... {}->{}", app, instance_id);

        let url = self.inner.endpoint(&[app, instance_id])?;
        let response = self.inner.http.delete(url).send().await?;

        if response.status() != StatusCode::OK {
            error!(
                "Could not de-register from Eureka {}->{} (code: {})",
                app,
                instance_id,
                response.status().as_u16()
            );
            return Err(DiscoveryError::registry(format!(
                "Could not de-register from Eureka {}->{}",
                app, instance_id
            )));
        }

        self.inner
            .registered
            .write()
            .await
            .remove(&format!("{}->{}", app, instance_id));
        Ok(())
    }

    /// Check whether the registry knows the instance
    pub async fn is_registered(&self, instance: &ServiceInstance) -> bool {
        self.is_registered2(instance.app(), instance.instance_id())
            .await
    }

    /// Check whether the registry knows `app`/`instance_id`. Never fails.
    pub async fn is_registered2(&self, app: &str, instance_id: &str) -> bool {
        let url = match self.inner.endpoint(&[app, instance_id]) {
            Ok(url) => url,
            Err(e) => {
                error!("Could not check registration of {}->{}: {}", app, instance_id, e);
                return false;
            }
        };

        match self.inner.http.get(url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                error!("Could not check registration of {}->{}: {}", app, instance_id, e);
                false
            }
        }
    }

    /// All instances of `app`, in registry order. Empty on any failure.
    pub async fn find_service(&self, app: &str) -> Vec<ServiceInstance> {
        let response = match self.inner.get(&[app]).await {
            Ok(response) => response,
            Err(e) => {
                error!("No instance found for '{}'. {}", app, e);
                return Vec::new();
            }
        };

        if response.status() != StatusCode::OK {
            error!(
                "Could not get instances from Eureka for '{}' (code: {})",
                app,
                response.status().as_u16()
            );
            return Vec::new();
        }

        let body: ApplicationEnvelope = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Unreadable instance list for '{}'. {}", app, e);
                return Vec::new();
            }
        };

        let Some(entries) = body.application.and_then(|application| application.instance) else {
            error!("No instance found for '{}'", app);
            return Vec::new();
        };

        entries
            .into_vec()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<ServiceInstance>(entry) {
                Ok(instance) => Some(instance),
                Err(e) => {
                    warn!("Skipping unreadable instance of '{}': {}", app, e);
                    None
                }
            })
            .collect()
    }

    /// One instance of `app`. `None` on any failure.
    pub async fn find_service_instance(
        &self,
        app: &str,
        instance_id: &str,
    ) -> Option<ServiceInstance> {
        let response = match self.inner.get(&[app, instance_id]).await {
            Ok(response) => response,
            Err(e) => {
                error!("No instance found for '{}/{}'. {}", app, instance_id, e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            error!(
                "Could not get instance from Eureka for '{}/{}' (code: {})",
                app,
                instance_id,
                response.status().as_u16()
            );
            return None;
        }

        let body: InstanceEnvelope = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                error!("Unreadable instance '{}/{}'. {}", app, instance_id, e);
                return None;
            }
        };

        if body.instance.is_none() {
            error!("No instance found for '{}/{}'", app, instance_id);
        }
        body.instance
    }

    /// Snapshot of the instances this client keeps alive
    pub async fn registered_instances(&self) -> Vec<ServiceInstance> {
        self.inner.registered.read().await.values().cloned().collect()
    }

    /// Whether the heartbeat timer is running
    pub fn is_heartbeat_active(&self) -> bool {
        self.heartbeat.is_active()
    }

    /// Stop renewing leases. Registered instances stay in the registry until
    /// their lease expires.
    pub fn shutdown(&self) {
        if self.heartbeat.is_active() {
            info!("Stopping heartbeats for Eureka client '{}'", self.inner.config.name);
        }
        self.heartbeat.stop();
    }

    fn start_heartbeat(&self) {
        let inner = self.inner.clone();
        self.heartbeat.start(move || {
            let inner = inner.clone();
            async move { inner.renew_all().await }
        });
    }
}

impl Inner {
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        transport::endpoint(&self.config.service_url, &APPS_PATH, segments)
    }

    async fn get(&self, segments: &[&str]) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        Ok(self.http.get(url).send().await?)
    }

    async fn heartbeat(&self, instance: &ServiceInstance) -> Result<()> {
        info!("Sending heartbeat ... {}", instance.id());

        let url = self.endpoint(&[instance.app(), instance.instance_id()])?;
        let response = self
            .http
            .put(url)
            .send()
            .await
            .map_err(DiscoveryError::wrap)?;

        if response.status() != StatusCode::OK {
            warn!(
                "Heartbeat failed for {} (code: {})",
                instance.id(),
                response.status().as_u16()
            );
        }
        Ok(())
    }

    async fn renew_all(&self) {
        let instances: Vec<ServiceInstance> =
            self.registered.read().await.values().cloned().collect();

        for instance in &instances {
            if let Err(e) = self.heartbeat(instance).await {
                error!("Heartbeat failed with exception for {}: {}", instance.id(), e);
            }
        }
    }
}

#[async_trait]
impl RegistryClient for EurekaClient {
    type Registration = ServiceInstance;
    type Deregistration = ServiceInstance;

    fn kind() -> BackendKind {
        BackendKind::Eureka
    }

    fn connect(config: ConnectionConfig) -> Result<Self> {
        Self::new(config)
    }

    fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Announce the instance.
    ///
    /// Only a 204 answer counts as registered: the instance is then kept
    /// alive by the heartbeat timer, started on the first such answer. Other
    /// statuses are logged and swallowed. Transport failures are wrapped
    /// into [`DiscoveryError::Registry`].
    async fn register(&self, instance: &ServiceInstance) -> Result<()> {
        info!("Register service instance ... {}", instance.id());

        let url = self.inner.endpoint(&[instance.app()])?;
        let body = serde_json::json!({ "instance": instance });
        let response = self
            .inner
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(DiscoveryError::wrap)?;

        if response.status() != StatusCode::NO_CONTENT {
            warn!(
                "Could not register with Eureka ... {} (code: {})",
                instance.id(),
                response.status().as_u16()
            );
            return Ok(());
        }

        self.inner
            .registered
            .write()
            .await
            .insert(instance.id(), instance.clone());
        self.start_heartbeat();
        Ok(())
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<()> {
        self.deregister2(instance.app(), instance.instance_id())
            .await
    }
}

impl std::fmt::Debug for EurekaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EurekaClient")
            .field("name", &self.inner.config.name)
            .field("service_url", &self.inner.config.service_url.as_str())
            .field("heartbeat", &self.heartbeat)
            .finish()
    }
}

impl Drop for EurekaClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> EurekaClient {
        EurekaClient::from_entry(&ConfigEntry::new().with("serviceUrl", url)).unwrap()
    }

    #[test]
    fn test_endpoint() {
        let eureka = client("http://localhost:8761/eureka");
        let url = eureka.inner.endpoint(&["ORDERS", "orders-1"]).unwrap();

        assert_eq!(url.as_str(), "http://localhost:8761/eureka/v2/apps/ORDERS/orders-1");
    }

    #[test]
    fn test_one_or_many() {
        let one: OneOrMany<u32> = serde_json::from_str("7").unwrap();
        let many: OneOrMany<u32> = serde_json::from_str("[1, 2]").unwrap();

        assert_eq!(one.into_vec(), vec![7]);
        assert_eq!(many.into_vec(), vec![1, 2]);
    }

    #[test]
    fn test_new_client_is_idle() {
        let eureka = client("http://localhost:8761");
        assert!(!eureka.is_heartbeat_active());
        assert_eq!(eureka.name(), "eureka-netflix-1");
    }
}
