//! Integration tests for the Consul catalog client

use registrar_config::ConfigEntry;
use registrar_discovery::*;
use serde_json::json;
use std::time::Duration;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn consul(server: &MockServer) -> ConsulCatalogClient {
    ConsulCatalogClient::from_entry(&ConfigEntry::new().with("serviceUrl", server.uri())).unwrap()
}

fn registration() -> CatalogRegistration {
    CatalogRegistration::new("node-1", "10.0.0.5")
        .with_service(AgentService::new("orders-1", "orders", 8080).with_tag("v1"))
}

#[tokio::test]
async fn test_register() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/register"))
        .and(body_partial_json(json!({
            "Node": "node-1",
            "Address": "10.0.0.5",
            "Service": { "ID": "orders-1", "Service": "orders", "Port": 8080, "Tags": ["v1"] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;

    assert_ok!(consul(&server).register(&registration()).await);
}

#[tokio::test]
async fn test_register_with_options() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/register"))
        .and(query_param("dc", "dc2"))
        .and(header("X-Consul-Token", "write-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;

    let options = WriteOptions::new().datacenter("dc2").token("write-token");
    let meta = consul(&server)
        .register_with(&registration(), Some(&options))
        .await
        .unwrap();
    assert!(meta.request_time < Duration::from_secs(5));
}

#[tokio::test]
async fn test_register_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/register"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Permission denied"))
        .mount(&server)
        .await;

    let err = consul(&server).register(&registration()).await.unwrap_err();
    assert!(err.is_registry());
    assert!(!err.is_transport());
    assert!(err.to_string().contains("Permission denied"));
}

#[tokio::test]
async fn test_transport_failure_is_wrapped() {
    let client =
        ConsulCatalogClient::from_entry(&ConfigEntry::new().with("serviceUrl", "http://127.0.0.1:1"))
            .unwrap();

    let err = client.register(&registration()).await.unwrap_err();
    assert!(err.is_registry());
    assert!(err.is_transport());

    let err = client.get_nodes(None).await.unwrap_err();
    assert!(err.is_registry());
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_deregister() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/deregister"))
        .and(body_partial_json(json!({ "Node": "node-1", "ServiceID": "orders-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .expect(1)
        .mount(&server)
        .await;

    let client = consul(&server);
    assert_ok!(client.deregister(&CatalogDeregistration::service("node-1", "orders-1")).await);
}

#[tokio::test]
async fn test_deregister_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/catalog/deregister"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rpc error"))
        .mount(&server)
        .await;

    let err = consul(&server)
        .deregister(&CatalogDeregistration::node("node-1"))
        .await
        .unwrap_err();
    assert!(err.is_registry());
    assert!(err.to_string().contains("rpc error"));
}

#[tokio::test]
async fn test_get_data_centers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/datacenters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["dc1", "dc2"])))
        .mount(&server)
        .await;

    let datacenters = consul(&server).get_data_centers().await.unwrap();
    assert_eq!(datacenters, vec!["dc1", "dc2"]);
}

#[tokio::test]
async fn test_get_nodes_with_meta() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/nodes"))
        .and(query_param("dc", "dc1"))
        .and(header("X-Consul-Token", "acl"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Consul-Index", "42")
                .insert_header("X-Consul-KnownLeader", "true")
                .insert_header("X-Consul-LastContact", "0")
                .set_body_json(json!([
                    { "ID": "n1", "Node": "node-1", "Address": "10.0.0.5", "Datacenter": "dc1", "Meta": null }
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ConsulCatalogClient::from_entry(
        &ConfigEntry::new()
            .with("serviceUrl", server.uri())
            .with("dataCenter", "dc1")
            .with("consulToken", "acl"),
    )
    .unwrap();

    let response = client.get_nodes(None).await.unwrap();
    assert_eq!(response.value.len(), 1);
    assert_eq!(response.value[0].node, "node-1");
    assert!(response.value[0].meta.is_empty());
    assert_eq!(response.meta.last_index, 42);
    assert!(response.meta.known_leader);
}

#[tokio::test]
async fn test_get_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/services"))
        .and(query_param("stale", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "consul": [],
            "orders": ["v1", "primary"]
        })))
        .mount(&server)
        .await;

    let options = QueryOptions::new().consistency(Consistency::Stale);
    let response = consul(&server).get_services(Some(&options)).await.unwrap();
    assert_eq!(response.value["orders"], vec!["v1", "primary"]);
    assert!(response.value["consul"].is_empty());
}

#[tokio::test]
async fn test_get_nodes_for_service_with_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/service/orders"))
        .and(query_param("tag", "v1"))
        .and(query_param("tag", "primary"))
        .and(query_param("index", "7"))
        .and(query_param("wait", "2000ms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "Node": "node-1",
            "Address": "10.0.0.5",
            "ServiceID": "orders-1",
            "ServiceName": "orders",
            "ServiceTags": ["v1", "primary"],
            "ServicePort": 8080
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let options = QueryOptions::new().blocking(7, Duration::from_secs(2));
    let response = consul(&server)
        .get_nodes_for_service("orders", &["v1", "primary"], Some(&options))
        .await
        .unwrap();

    assert_eq!(response.value.len(), 1);
    assert_eq!(response.value[0].service_id, "orders-1");
    assert_eq!(response.value[0].service_port, 8080);
}

#[tokio::test]
async fn test_get_services_for_node() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/node-services/node-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Node": { "Node": "node-1", "Address": "10.0.0.5" },
            "Services": [{ "ID": "orders-1", "Service": "orders", "Port": 8080, "Tags": null }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/node-services/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Node not found"))
        .mount(&server)
        .await;

    let client = consul(&server);

    let list = client.get_services_for_node("node-1", None).await.unwrap().value.unwrap();
    assert_eq!(list.node.unwrap().address, "10.0.0.5");
    assert_eq!(list.services[0].id, "orders-1");
    assert!(list.services[0].tags.is_empty());

    let missing = client.get_services_for_node("ghost", None).await.unwrap();
    assert!(missing.value.is_none());
}

#[tokio::test]
async fn test_get_services_for_node_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/node/node-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Node": { "Node": "node-1", "Address": "10.0.0.5" },
            "Services": { "orders-1": { "ID": "orders-1", "Service": "orders", "Port": 8080 } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/node/ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let client = consul(&server);

    let node = client.get_services_for_node_by_id("node-1", None).await.unwrap().value.unwrap();
    assert_eq!(node.services["orders-1"].port, 8080);

    let missing = client.get_services_for_node_by_id("ghost", None).await.unwrap();
    assert!(missing.value.is_none());
}

#[tokio::test]
async fn test_get_gateway_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/gateway-services/ingress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "Gateway": { "Name": "ingress" },
            "Service": { "Name": "orders" },
            "GatewayKind": "ingress-gateway",
            "Port": 8443,
            "Protocol": "http",
            "Hosts": ["orders.example.com"]
        }])))
        .mount(&server)
        .await;

    let response = consul(&server).get_gateway_services("ingress", None).await.unwrap();
    assert_eq!(response.value[0].service.name, "orders");
    assert_eq!(response.value[0].port, 8443);
}

#[tokio::test]
async fn test_read_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/catalog/services"))
        .respond_with(ResponseTemplate::new(500).set_body_string("No cluster leader"))
        .mount(&server)
        .await;

    let err = consul(&server).get_services(None).await.unwrap_err();
    assert!(err.is_registry());
    assert!(err.to_string().contains("No cluster leader"));
}
