//! HTTP transport construction.

use crate::connection::ConnectionConfig;
use crate::error::{DiscoveryError, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

const JSON: &str = "application/json";

/// Build the HTTP client a registry adapter talks through.
///
/// Every request carries JSON content negotiation headers and, when
/// credentials are configured, the resolved `Authorization` header.
pub(crate) fn build_client(config: &ConnectionConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));

    if let Some(authorization) = &config.authorization {
        let mut value = HeaderValue::from_str(authorization).map_err(|e| {
            DiscoveryError::Configuration(format!("invalid Authorization header: {}", e))
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("registrar/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(config.ignore_ssl);

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(ca_file) = &config.consul.ca_file {
        let pem = read_pem(ca_file)?;
        let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
            DiscoveryError::Configuration(format!("invalid caFile {}: {}", ca_file.display(), e))
        })?;
        builder = builder.add_root_certificate(certificate);
    }

    if let (Some(cert_file), Some(key_file)) = (&config.consul.cert_file, &config.consul.key_file)
    {
        let mut pem = read_pem(cert_file)?;
        pem.push(b'\n');
        pem.extend(read_pem(key_file)?);
        let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
            DiscoveryError::Configuration(format!("invalid client certificate: {}", e))
        })?;
        builder = builder.identity(identity);
    }

    debug!(
        client = %config.name,
        backend = %config.kind,
        base_url = %config.service_url,
        ignore_ssl = config.ignore_ssl,
        "Building registry transport"
    );

    builder.build().map_err(|e| {
        DiscoveryError::Configuration(format!("failed to build HTTP client: {}", e))
    })
}

/// Resolve an API path against the registry base URL.
///
/// The base URL contributes scheme, host and port only; its path and query
/// are replaced. Segments are percent-encoded.
pub(crate) fn endpoint(base: &Url, prefix: &[&str], segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| {
            DiscoveryError::Configuration(format!("'{}' cannot be used as a base URL", base))
        })?
        .clear()
        .extend(prefix)
        .extend(segments);
    Ok(url)
}

fn read_pem(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        DiscoveryError::Configuration(format!("could not read {}: {}", path.display(), e))
    })
}
