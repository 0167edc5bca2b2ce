// Discovery configuration for the Registrar registry clients
//
// A discovery document holds one section per backend family, each an ordered
// list of client entries:
//
//     [[consul]]
//     serviceUrl = "http://127.0.0.1:8500"
//
//     [[eureka]]
//     name = "primary"
//     serviceUrl = "http://127.0.0.1:8761"
//     credentials = "user:secret"

pub mod entry;
pub mod error;
pub mod loader;
pub mod validation;

pub use entry::ConfigEntry;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use serde_json::Value;
use std::path::Path;

/// Section key of the Consul catalog entries
pub const CONSUL_SECTION: &str = "consul";

/// Section key of the Eureka entries
pub const EUREKA_SECTION: &str = "eureka";

/// Prefix of the positional default name of an unnamed Consul entry
pub const CONSUL_NAME_PREFIX: &str = "eureka-consul";

/// Prefix of the positional default name of an unnamed Eureka entry
pub const EUREKA_NAME_PREFIX: &str = "eureka-netflix";

/// Parsed discovery document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryConfig {
    pub consul: Option<Vec<ConfigEntry>>,
    pub eureka: Option<Vec<ConfigEntry>>,
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a Consul entry
    pub fn with_consul(mut self, entry: ConfigEntry) -> Self {
        self.consul.get_or_insert_with(Vec::new).push(entry);
        self
    }

    /// Add a Eureka entry
    pub fn with_eureka(mut self, entry: ConfigEntry) -> Self {
        self.eureka.get_or_insert_with(Vec::new).push(entry);
        self
    }

    /// Load a document from a JSON or TOML file, picked by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        Self::from_value(value)
    }

    /// Build from an already parsed document
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(ConfigError::ValidationError(
                "discovery configuration must be a mapping".to_string(),
            ));
        };

        Ok(Self {
            consul: section(root.remove(CONSUL_SECTION), CONSUL_SECTION)?,
            eureka: section(root.remove(EUREKA_SECTION), EUREKA_SECTION)?,
        })
    }

    /// Assign positional default names and reject duplicates.
    ///
    /// Entries without a `name` become `eureka-consul-{n}` /
    /// `eureka-netflix-{n}`, where `n` is the 1-based position inside their
    /// section. Names share a single namespace across both sections.
    pub fn normalize(mut self) -> Result<Self> {
        assign_names(self.consul.as_mut(), CONSUL_NAME_PREFIX);
        assign_names(self.eureka.as_mut(), EUREKA_NAME_PREFIX);
        self.validate()?;
        Ok(self)
    }

    /// All configured client names, Consul first, in document order
    pub fn names(&self) -> Vec<String> {
        self.consul
            .iter()
            .chain(self.eureka.iter())
            .flatten()
            .filter_map(ConfigEntry::name)
            .collect()
    }
}

impl Validate for DiscoveryConfig {
    fn validate(&self) -> Result<()> {
        let names = self.names();
        for name in &names {
            ConfigValidator::not_empty(name, "name")?;
        }
        ConfigValidator::unique_names(names.iter().map(String::as_str))
    }
}

fn section(value: Option<Value>, key: &str) -> Result<Option<Vec<ConfigEntry>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| {
                ConfigEntry::try_from(item).map_err(|e| {
                    ConfigError::ValidationError(format!("section '{}': {}", key, e))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(_) => Err(ConfigError::ValidationError(format!(
            "section '{}' must be a list of entries",
            key
        ))),
    }
}

fn assign_names(entries: Option<&mut Vec<ConfigEntry>>, prefix: &str) {
    for (index, entry) in entries.into_iter().flatten().enumerate() {
        if !entry.has("name") {
            entry.set("name", format!("{}-{}", prefix, index + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let config = DiscoveryConfig::from_value(json!({
            "consul": [{"serviceUrl": "http://localhost:8500"}],
        }))
        .unwrap();

        assert_eq!(config.consul.as_ref().map(Vec::len), Some(1));
        assert!(config.eureka.is_none());
    }

    #[test]
    fn test_section_must_be_list() {
        let result = DiscoveryConfig::from_value(json!({
            "eureka": {"serviceUrl": "http://localhost:8761"},
        }));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_default_names() {
        let config = DiscoveryConfig::new()
            .with_consul(ConfigEntry::new())
            .with_eureka(ConfigEntry::new().with("name", "primary"))
            .with_eureka(ConfigEntry::new())
            .normalize()
            .unwrap();

        assert_eq!(config.names(), vec!["eureka-consul-1", "primary", "eureka-netflix-2"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = DiscoveryConfig::new()
            .with_eureka(ConfigEntry::new().with("name", "registry"))
            .with_eureka(ConfigEntry::new().with("name", "registry"))
            .normalize();

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_explicit_name_colliding_with_default() {
        let result = DiscoveryConfig::new()
            .with_eureka(ConfigEntry::new())
            .with_eureka(ConfigEntry::new().with("name", "eureka-netflix-1"))
            .normalize();

        assert!(result.is_err());
    }
}
