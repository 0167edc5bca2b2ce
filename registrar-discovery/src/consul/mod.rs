//! Consul catalog client

mod types;

pub use types::*;

use crate::client::RegistryClient;
use crate::connection::{BackendKind, ConnectionConfig};
use crate::error::{DiscoveryError, Result};
use crate::transport;
use async_trait::async_trait;
use registrar_config::ConfigEntry;
use reqwest::header::HeaderMap;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use url::Url;

const CATALOG_PATH: [&str; 2] = ["v1", "catalog"];
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Consul catalog client.
///
/// A thin protocol layer: every call is one HTTP round trip. Writes and reads
/// fail with [`DiscoveryError::Registry`] on transport errors and on any
/// non-2xx answer, the latter carrying the body Consul sent back.
pub struct ConsulCatalogClient {
    config: ConnectionConfig,
    http: reqwest::Client,
}

impl ConsulCatalogClient {
    /// Create a client from validated connection settings
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let http = transport::build_client(&config)?;
        Ok(Self { config, http })
    }

    /// Create a client straight from a configuration entry
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use registrar_config::ConfigEntry;
    /// use registrar_discovery::ConsulCatalogClient;
    ///
    /// let consul = ConsulCatalogClient::from_entry(
    ///     &ConfigEntry::new()
    ///         .with("serviceUrl", "http://localhost:8500")
    ///         .with("dataCenter", "dc1"),
    /// )?;
    /// ```
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self> {
        Self::new(ConnectionConfig::from_entry(entry, BackendKind::Consul)?)
    }

    /// Register a node, and optionally a service and check, in the catalog
    pub async fn register_with(
        &self,
        registration: &CatalogRegistration,
        options: Option<&WriteOptions>,
    ) -> Result<WriteMeta> {
        info!("Register service instance ... {}", registration.describe());
        self.write("register", registration, options).await
    }

    /// Remove a node, service or check from the catalog
    pub async fn deregister_with(
        &self,
        deregistration: &CatalogDeregistration,
        options: Option<&WriteOptions>,
    ) -> Result<WriteMeta> {
        info!(
            "De-registering service ... {}/{}",
            deregistration.node,
            deregistration.service_id.as_deref().unwrap_or("*")
        );
        self.write("deregister", deregistration, options).await
    }

    /// Known datacenters, nearest first
    pub async fn get_data_centers(&self) -> Result<Vec<String>> {
        let response = self.send(self.http.get(self.endpoint(&["datacenters"])?)).await?;
        response.json().await.map_err(DiscoveryError::wrap)
    }

    pub async fn get_nodes(&self, options: Option<&QueryOptions>) -> Result<QueryResponse<Vec<Node>>> {
        self.query(&["nodes"], &[], options).await
    }

    /// Service names mapped to the union of their tags
    pub async fn get_services(
        &self,
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<HashMap<String, Vec<String>>>> {
        self.query(&["services"], &[], options).await
    }

    /// Services on `node`, `None` when the node is unknown
    pub async fn get_services_for_node(
        &self,
        node: &str,
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<Option<CatalogNodeServiceList>>> {
        self.query_optional(&["node-services", node], options).await
    }

    /// Instances of `service`. Every tag in `tags` must be present.
    pub async fn get_nodes_for_service(
        &self,
        service: &str,
        tags: &[&str],
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<Vec<CatalogService>>> {
        let tags: Vec<(&str, String)> = tags.iter().map(|tag| ("tag", tag.to_string())).collect();
        self.query(&["service", service], &tags, options).await
    }

    /// Node and services keyed by service ID, `None` when the node is unknown
    pub async fn get_services_for_node_by_id(
        &self,
        node: &str,
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<Option<CatalogNode>>> {
        self.query_optional(&["node", node], options).await
    }

    pub async fn get_gateway_services(
        &self,
        gateway: &str,
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<Vec<GatewayService>>> {
        self.query(&["gateway-services", gateway], &[], options).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        transport::endpoint(&self.config.service_url, &CATALOG_PATH, segments)
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
        options: Option<&WriteOptions>,
    ) -> Result<WriteMeta> {
        let started = Instant::now();
        let request = self
            .http
            .put(self.endpoint(&[action])?)
            .query(&self.write_params(options))
            .json(body);
        let request = self.with_token(request, options.and_then(|o| o.token.as_deref()));

        match self.send(request).await {
            Ok(_) => Ok(WriteMeta {
                request_time: started.elapsed(),
            }),
            Err(e) => {
                error!("Could not {} with Consul: {}", action, e);
                Err(e)
            }
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        extra: &[(&str, String)],
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<T>> {
        let started = Instant::now();
        let response = self.send(self.read_request(segments, extra, options)?).await?;
        let meta = query_meta(response.headers(), started.elapsed());
        let value = response.json().await.map_err(DiscoveryError::wrap)?;
        Ok(QueryResponse { value, meta })
    }

    /// Like [`query`](Self::query), with a 404 read as "no such node"
    async fn query_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        options: Option<&QueryOptions>,
    ) -> Result<QueryResponse<Option<T>>> {
        let started = Instant::now();
        let request = self.read_request(segments, &[], options)?;
        let response = request.send().await.map_err(DiscoveryError::wrap)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(QueryResponse {
                value: None,
                meta: query_meta(response.headers(), started.elapsed()),
            });
        }

        let response = check_status(response).await?;
        let meta = query_meta(response.headers(), started.elapsed());
        let value = response.json().await.map_err(DiscoveryError::wrap)?;
        Ok(QueryResponse { value, meta })
    }

    fn read_request(
        &self,
        segments: &[&str],
        extra: &[(&str, String)],
        options: Option<&QueryOptions>,
    ) -> Result<RequestBuilder> {
        let request = self
            .http
            .get(self.endpoint(segments)?)
            .query(&self.query_params(options))
            .query(extra);
        Ok(self.with_token(request, options.and_then(|o| o.token.as_deref())))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(DiscoveryError::wrap)?;
        debug!(
            client = %self.config.name,
            url = %response.url(),
            status = response.status().as_u16(),
            "Consul response"
        );
        check_status(response).await
    }

    fn query_params(&self, options: Option<&QueryOptions>) -> Vec<(&'static str, String)> {
        let defaults = &self.config.consul;
        let mut params = Vec::new();

        let datacenter = options.and_then(|o| o.datacenter.as_ref());
        if let Some(dc) = datacenter.or(defaults.datacenter.as_ref()) {
            params.push(("dc", dc.clone()));
        }

        let Some(options) = options else {
            if let Some(wait) = defaults.wait_time {
                params.push(("wait", wait_param(wait)));
            }
            return params;
        };

        if let Some(index) = options.wait_index {
            params.push(("index", index.to_string()));
        }
        if let Some(wait) = options.wait_time.or(defaults.wait_time) {
            params.push(("wait", wait_param(wait)));
        }
        match options.consistency {
            Consistency::Default => {}
            Consistency::Consistent => params.push(("consistent", String::new())),
            Consistency::Stale => params.push(("stale", String::new())),
        }
        if let Some(near) = &options.near {
            params.push(("near", near.clone()));
        }
        if let Some(filter) = &options.filter {
            params.push(("filter", filter.clone()));
        }
        for (key, value) in &options.node_meta {
            params.push(("node-meta", format!("{}:{}", key, value)));
        }
        params
    }

    fn write_params(&self, options: Option<&WriteOptions>) -> Vec<(&'static str, String)> {
        options
            .and_then(|o| o.datacenter.as_ref())
            .or(self.config.consul.datacenter.as_ref())
            .map(|dc| vec![("dc", dc.clone())])
            .unwrap_or_default()
    }

    fn with_token(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token.or(self.config.consul.token.as_deref()) {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }
}

impl std::fmt::Debug for ConsulCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulCatalogClient")
            .field("name", &self.config.name)
            .field("service_url", &self.config.service_url.as_str())
            .field("datacenter", &self.config.consul.datacenter)
            .finish()
    }
}

/// Turn a non-2xx answer into a backend-reported error
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = if body.trim().is_empty() {
        format!("Unexpected response code: {}", status.as_u16())
    } else {
        format!("Unexpected response code: {} ({})", status.as_u16(), body.trim())
    };
    error!("{}", message);
    Err(DiscoveryError::registry(message))
}

fn query_meta(headers: &HeaderMap, request_time: Duration) -> QueryMeta {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    QueryMeta {
        last_index: header("x-consul-index")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        last_contact: header("x-consul-lastcontact")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or_default(),
        known_leader: header("x-consul-knownleader") == Some("true"),
        request_time,
    }
}

fn wait_param(wait: Duration) -> String {
    format!("{}ms", wait.as_millis())
}

#[async_trait]
impl RegistryClient for ConsulCatalogClient {
    type Registration = CatalogRegistration;
    type Deregistration = CatalogDeregistration;

    fn kind() -> BackendKind {
        BackendKind::Consul
    }

    fn connect(config: ConnectionConfig) -> Result<Self> {
        Self::new(config)
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn register(&self, registration: &CatalogRegistration) -> Result<()> {
        self.register_with(registration, None).await.map(|_| ())
    }

    async fn deregister(&self, deregistration: &CatalogDeregistration) -> Result<()> {
        self.deregister_with(deregistration, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn client(entry: ConfigEntry) -> ConsulCatalogClient {
        ConsulCatalogClient::from_entry(&entry.with("serviceUrl", "http://localhost:8500")).unwrap()
    }

    #[test]
    fn test_default_query_params() {
        let consul = client(ConfigEntry::new().with("dataCenter", "dc1").with("waitTimeSecs", 5));

        assert_eq!(
            consul.query_params(None),
            vec![("dc", "dc1".to_string()), ("wait", "5000ms".to_string())]
        );
    }

    #[test]
    fn test_query_params_override_defaults() {
        let consul = client(ConfigEntry::new().with("dataCenter", "dc1"));
        let options = QueryOptions::new()
            .datacenter("dc2")
            .blocking(42, Duration::from_secs(1))
            .consistency(Consistency::Stale)
            .node_meta("rack", "r1");

        assert_eq!(
            consul.query_params(Some(&options)),
            vec![
                ("dc", "dc2".to_string()),
                ("index", "42".to_string()),
                ("wait", "1000ms".to_string()),
                ("stale", String::new()),
                ("node-meta", "rack:r1".to_string()),
            ]
        );
    }

    #[test]
    fn test_write_params() {
        let consul = client(ConfigEntry::new());
        assert!(consul.write_params(None).is_empty());

        let options = WriteOptions::new().datacenter("dc3");
        assert_eq!(consul.write_params(Some(&options)), vec![("dc", "dc3".to_string())]);
    }

    #[test]
    fn test_query_meta_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Consul-Index", HeaderValue::from_static("17"));
        headers.insert("X-Consul-KnownLeader", HeaderValue::from_static("true"));
        headers.insert("X-Consul-LastContact", HeaderValue::from_static("25"));

        let meta = query_meta(&headers, Duration::from_millis(3));
        assert_eq!(meta.last_index, 17);
        assert!(meta.known_leader);
        assert_eq!(meta.last_contact, Duration::from_millis(25));
        assert_eq!(meta.request_time, Duration::from_millis(3));
    }

    #[test]
    fn test_query_meta_without_headers() {
        let meta = query_meta(&HeaderMap::new(), Duration::ZERO);
        assert_eq!(meta, QueryMeta::default());
    }
}
