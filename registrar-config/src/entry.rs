// A single backend entry of the discovery document

use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One string-keyed configuration mapping describing a registry client.
///
/// Values are read leniently: documents written by hand (or produced from
/// environment variables) often carry numbers and booleans as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigEntry {
    values: Map<String, Value>,
}

impl ConfigEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Check if a key is present and not null
    pub fn has(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_null())
    }

    /// Raw value access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Get a string value. Numbers and booleans are rendered as strings.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Get a required string value
    pub fn require_str(&self, key: &str) -> Result<String> {
        self.get_str(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// Get a boolean value, accepting `true`, `"true"`, `"1"`, `"yes"` and non-zero numbers
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => Some(matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )),
            _ => None,
        }
    }

    /// Get an unsigned integer value.
    ///
    /// Numeric strings are parsed; anything non-numeric or negative reads as 0.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => Some(
                n.as_u64()
                    .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
                    .unwrap_or(0),
            ),
            Value::String(s) => Some(s.trim().parse::<u64>().unwrap_or(0)),
            Value::Bool(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    /// The entry's client name, if one was configured
    pub fn name(&self) -> Option<String> {
        self.get_str("name")
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for ConfigEntry {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl TryFrom<Value> for ConfigEntry {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(ConfigError::ValidationError(format!(
                "expected a mapping, found {}",
                other
            ))),
        }
    }
}
