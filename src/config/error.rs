//! Configuration error types.

use thiserror::Error;

/// Errors raised while building sessions, loading settings or resolving
/// folders. These are fatal to the operation that raised them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("Invalid endpoint '{uri}': {reason}")]
    InvalidEndpoint { uri: String, reason: String },

    #[error("Unsupported folder type: {0}")]
    UnsupportedFolderType(String),

    #[error("Unsupported service: {0}")]
    UnsupportedService(String),

    #[error("Custom folder '{0}' requires a provider handle")]
    MissingFolderHandle(String),

    #[error("Folder '{folder}' belongs to {folder_service}, not {target}")]
    FolderServiceMismatch {
        folder: String,
        folder_service: String,
        target: String,
    },

    #[error("Settings I/O error: {0}")]
    Io(String),

    #[error("Settings parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            ConfigError::MissingSecret("owaPassword".to_string()).to_string(),
            "Missing required secret: owaPassword"
        );
        let mismatch = ConfigError::FolderServiceMismatch {
            folder: "Inbox".to_string(),
            folder_service: "Gmail".to_string(),
            target: "OWA".to_string(),
        };
        assert_eq!(mismatch.to_string(), "Folder 'Inbox' belongs to Gmail, not OWA");
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ConfigError::from(err), ConfigError::Parse(_)));
    }
}
