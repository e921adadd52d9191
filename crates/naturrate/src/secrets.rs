//! Vendor credential resolution.
//!
//! A [`SecretRef`] names where a credential lives. Sources are tried in
//! priority order:
//!
//! 1. **Direct value** - for quick local testing (`"value": "sk-..."`)
//! 2. **File reference** - Docker secrets pattern (`"file": "/run/secrets/openai"`)
//! 3. **Env var reference** - production default (`"envVar": "OPENAI_API_KEY"`)

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided for {name} (need one of: value, file, or envVar)")]
    NoSourceProvided { name: String },

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where to find a credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl SecretRef {
    /// A reference that reads the named environment variable.
    pub fn env(name: &str) -> Self {
        Self {
            env_var: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// A reference holding the value inline.
    pub fn direct(value: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    /// Resolves the secret; `name` is only used in error messages.
    pub fn resolve(&self, name: &str) -> Result<SecretString> {
        resolve_secret(
            name,
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
    }

    /// Like [`resolve`](Self::resolve) but treats "no source configured" as `None`.
    pub fn resolve_optional(&self, name: &str) -> Result<Option<SecretString>> {
        match self.resolve(name) {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resolves a secret from a direct value, a file, or an environment variable,
/// in that order. Empty strings count as "not provided".
pub fn resolve_secret(
    name: &str,
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|source| SecretError::FileReadError {
                path: expanded,
                source,
            });
    }

    if let Some(var_name) = env_var.filter(|v| !v.is_empty()) {
        return match std::env::var(var_name) {
            // Env vars may carry trailing newlines
            Ok(value) => Ok(SecretString::from(value.trim())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided {
        name: name.to_string(),
    })
}

/// Expands a leading `~` to the user's home directory (`~user` is not supported).
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;

    // Tests that modify environment variables run serially
    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("NATURRATE_TEST_SECRET", "from-env");
        let secret = resolve_secret(
            "test",
            Some("direct"),
            Some("/nonexistent"),
            Some("NATURRATE_TEST_SECRET"),
        )
        .unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("NATURRATE_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        std::env::set_var("NATURRATE_TEST_SECRET", "from-env");

        let secret = SecretRef {
            value: None,
            file: Some(file.path().to_string_lossy().to_string()),
            env_var: Some("NATURRATE_TEST_SECRET".to_string()),
        }
        .resolve("test")
        .unwrap();

        assert_eq!(secret.expose_secret(), "from-file");
        std::env::remove_var("NATURRATE_TEST_SECRET");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("NATURRATE_TEST_SECRET", "from-env\n");
        let secret = SecretRef::env("NATURRATE_TEST_SECRET")
            .resolve("test")
            .unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("NATURRATE_TEST_SECRET");
    }

    #[test]
    fn test_no_source_error_names_secret() {
        let err = SecretRef::default().resolve("OpenAI API key").unwrap_err();
        assert!(matches!(err, SecretError::NoSourceProvided { .. }));
        assert!(err.to_string().contains("OpenAI API key"));
    }

    #[test]
    #[serial]
    fn test_empty_strings_ignored() {
        std::env::set_var("NATURRATE_TEST_SECRET", "from-env");
        let secret = resolve_secret("test", Some(""), Some(""), Some("NATURRATE_TEST_SECRET"))
            .unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("NATURRATE_TEST_SECRET");
    }

    #[test]
    fn test_file_not_found_error() {
        let err = resolve_secret("test", None, Some("/nonexistent/naturrate/secret"), None)
            .unwrap_err();
        assert!(matches!(err, SecretError::FileReadError { .. }));
    }

    #[test]
    #[serial]
    fn test_env_var_not_set_error() {
        std::env::remove_var("NATURRATE_DEFINITELY_UNSET");
        let err = SecretRef::env("NATURRATE_DEFINITELY_UNSET")
            .resolve("test")
            .unwrap_err();
        assert!(matches!(err, SecretError::EnvVarNotSet { .. }));
    }

    #[test]
    fn test_resolve_optional() {
        assert!(SecretRef::default()
            .resolve_optional("test")
            .unwrap()
            .is_none());
        let present = SecretRef::direct("abc").resolve_optional("test").unwrap();
        assert_eq!(present.unwrap().expose_secret(), "abc");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let r: SecretRef = serde_json::from_str(r#"{"envVar": "OPENAI_API_KEY"}"#).unwrap();
        assert_eq!(r, SecretRef::env("OPENAI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_expand_home() {
        let original = std::env::var_os("HOME");
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_home("~/secrets/key"), "/home/tester/secrets/key");
        assert_eq!(expand_home("~"), "/home/tester");
        assert_eq!(expand_home("/abs/path"), "/abs/path");
        assert_eq!(expand_home("~alice/key"), "~alice/key");
        match original {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
    }
}
