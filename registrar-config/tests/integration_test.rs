//! Integration tests for registrar-config

use registrar_config::*;
use std::io::Write;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_toml_document() {
    let file = write_temp(
        ".toml",
        r#"
        [[consul]]
        serviceUrl = "http://127.0.0.1:8500"
        dataCenter = "dc1"

        [[eureka]]
        name = "primary"
        serviceUrl = "http://127.0.0.1:8761"
        credentials = "user:pass"
        "#,
    );

    let config = DiscoveryConfig::from_file(file.path())
        .unwrap()
        .normalize()
        .unwrap();

    let consul = config.consul.as_ref().unwrap();
    assert_eq!(consul[0].get_str("dataCenter").unwrap(), "dc1");
    assert_eq!(config.names(), vec!["eureka-consul-1", "primary"]);
}

#[test]
fn test_load_json_document() {
    let file = write_temp(
        ".json",
        r#"{"eureka": [{"serviceUrl": "http://a:8761"}, {"serviceUrl": "http://b:8761"}]}"#,
    );

    let config = DiscoveryConfig::from_file(file.path())
        .unwrap()
        .normalize()
        .unwrap();

    assert!(config.consul.is_none());
    assert_eq!(config.names(), vec!["eureka-netflix-1", "eureka-netflix-2"]);
}

#[test]
fn test_missing_file() {
    let result = DiscoveryConfig::from_file("/definitely/not/here/discovery.json");
    match result {
        Err(ConfigError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_extension() {
    let file = write_temp(".ini", "[consul]");
    assert!(DiscoveryConfig::from_file(file.path()).is_err());
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::KeyNotFound("serviceUrl".to_string());
    let display = format!("{}", err);
    assert!(display.contains("serviceUrl"));
}
