//! Discovery error types.

use registrar_config::ConfigError;
use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Service discovery errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Construction-time failure: missing or invalid settings, unreadable
    /// credential files, duplicate client names.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Operation-time failure reported by the registry or wrapping a
    /// transport failure.
    #[error("Registry error: {message}")]
    Registry {
        /// What went wrong.
        message: String,
        /// Underlying transport failure, when there was one.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Unwrapped transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No client configured under the requested name.
    #[error("Registry client not found: {0}")]
    ClientNotFound(String),
}

impl DiscoveryError {
    /// A registry error with no underlying cause.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a transport failure into a registry error.
    pub fn wrap(source: reqwest::Error) -> Self {
        Self::Registry {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Check if this is a construction-time error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a registry error, wrapped or not.
    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Registry { .. })
    }

    /// Check if this error came from the transport, wrapped or not.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Registry { source: Some(_), .. })
    }
}

impl From<ConfigError> for DiscoveryError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::KeyNotFound(key) => {
                Self::Configuration(format!("missing required field '{}'", key))
            }
            other => Self::Configuration(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_conversion() {
        let err: DiscoveryError = ConfigError::KeyNotFound("serviceUrl".to_string()).into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("serviceUrl"));
    }

    #[test]
    fn test_registry_without_source() {
        let err = DiscoveryError::registry("Could not de-register app->i1");
        assert!(err.is_registry());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Registry error: Could not de-register app->i1");
    }
}
