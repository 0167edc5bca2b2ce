//! Authorization header resolution

use crate::error::{DiscoveryError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use registrar_config::ConfigEntry;
use std::path::Path;

/// Auth type used when `authType` is not configured
pub const DEFAULT_AUTH_TYPE: &str = "Basic";

/// Resolves the `Authorization` header value for a registry client.
///
/// Inline `credentials` win over `credentialFile`. With neither present no
/// header is sent.
pub struct CredentialResolver;

impl CredentialResolver {
    /// Resolve the header value from a configuration entry
    pub fn resolve(entry: &ConfigEntry) -> Result<Option<String>> {
        let auth_type = entry
            .get_str("authType")
            .unwrap_or_else(|| DEFAULT_AUTH_TYPE.to_string());

        let credential = match (entry.get_str("credentials"), entry.get_str("credentialFile")) {
            (Some(inline), _) => Some(inline),
            (None, Some(file)) => Some(read_secret_file(&file, "credentialFile")?),
            (None, None) => None,
        };

        Ok(credential
            .filter(|c| !c.is_empty())
            .map(|c| Self::header_value(&auth_type, &c)))
    }

    /// Format a credential for the given auth type
    pub fn header_value(auth_type: &str, credential: &str) -> String {
        if auth_type == DEFAULT_AUTH_TYPE {
            format!("{} {}", auth_type, STANDARD.encode(credential))
        } else {
            format!("{} {}", auth_type, credential.replace('\n', " "))
        }
    }
}

/// Read a secret from disk, trimmed. A missing file is a configuration error.
pub(crate) fn read_secret_file(path: &str, field: &str) -> Result<String> {
    if !Path::new(path).exists() {
        return Err(DiscoveryError::Configuration(format!(
            "Could not find file '{}' configured as {}",
            path, field
        )));
    }

    std::fs::read_to_string(path)
        .map(|contents| contents.trim().to_string())
        .map_err(|e| {
            DiscoveryError::Configuration(format!("Could not read {} '{}': {}", field, path, e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_basic_is_default() {
        let entry = ConfigEntry::new().with("credentials", "user:pass");
        let header = CredentialResolver::resolve(&entry).unwrap();

        assert_eq!(header.as_deref(), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_other_auth_type_is_raw() {
        let entry = ConfigEntry::new()
            .with("authType", "Bearer")
            .with("credentials", "line-one\nline-two");
        let header = CredentialResolver::resolve(&entry).unwrap();

        assert_eq!(header.as_deref(), Some("Bearer line-one line-two"));
    }

    #[test]
    fn test_no_credentials() {
        let entry = ConfigEntry::new().with("authType", "Bearer");
        assert_eq!(CredentialResolver::resolve(&entry).unwrap(), None);
    }

    #[test]
    fn test_credential_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  user:pass  ").unwrap();

        let entry = ConfigEntry::new().with("credentialFile", file.path().to_str().unwrap());
        let header = CredentialResolver::resolve(&entry).unwrap();

        assert_eq!(header.as_deref(), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_inline_wins_over_file() {
        let entry = ConfigEntry::new()
            .with("credentials", "inline:secret")
            .with("credentialFile", "/does/not/exist");
        let header = CredentialResolver::resolve(&entry).unwrap();

        assert_eq!(
            header,
            Some(CredentialResolver::header_value("Basic", "inline:secret"))
        );
    }

    #[test]
    fn test_missing_credential_file() {
        let entry = ConfigEntry::new().with("credentialFile", "/does/not/exist");
        let err = CredentialResolver::resolve(&entry).unwrap_err();

        assert!(err.is_configuration());
    }
}
