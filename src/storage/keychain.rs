//! Keychain access for provider secrets.
//!
//! Wraps the keyring crate to provide OS-native credential storage. Every
//! keyring call blocks, so each one runs on the blocking thread pool.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{names, ConfigError, SecretSource};

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("Unknown secret name: {0}")]
    UnknownSecret(String),

    #[error("Secret value for {0} is empty")]
    EmptyValue(String),

    #[error("Failed to spawn blocking task: {0}")]
    TaskFailed(String),
}

impl From<KeychainError> for ConfigError {
    fn from(e: KeychainError) -> Self {
        match e {
            KeychainError::NotFound(name) => ConfigError::MissingSecret(name),
            other => ConfigError::SecretStore(other.to_string()),
        }
    }
}

/// Result type for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Reads and writes provider secrets in the OS keychain.
///
/// Secrets are stored under one service name, keyed by secret name
/// (`googleClientId`, `owaPassword`, ...).
#[derive(Debug, Clone)]
pub struct KeychainAccess {
    service_name: String,
}

impl KeychainAccess {
    /// Default service name for mailnorm secrets.
    pub const DEFAULT_SERVICE: &'static str = "io.mailnorm.app";

    /// Creates a new KeychainAccess with the default service name.
    pub fn new() -> Self {
        Self {
            service_name: Self::DEFAULT_SERVICE.to_string(),
        }
    }

    /// Creates a new KeychainAccess with a custom service name.
    ///
    /// Useful for testing to avoid interfering with real credentials.
    pub fn with_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Stores a known secret, overwriting any existing value.
    ///
    /// Returns the canonical name the value was stored under.
    pub async fn store(&self, name: &str, value: &str) -> Result<&'static str> {
        let name = canonical_name(name)?;
        if value.trim().is_empty() {
            return Err(KeychainError::EmptyValue(name.to_string()));
        }
        let service = self.service_name.clone();
        let value = value.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, name)?;
            entry.set_password(&value)?;
            Ok(name)
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Retrieves a secret, or `None` if it is not stored.
    pub async fn retrieve(&self, name: &str) -> Result<Option<String>> {
        let service = self.service_name.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &name)?;
            match entry.get_password() {
                Ok(password) => Ok(Some(password)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(KeychainError::Keyring(e)),
            }
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Deletes a known secret. Fails with `NotFound` if it does not exist.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = canonical_name(name)?;
        let service = self.service_name.clone();

        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, name)?;
            match entry.delete_credential() {
                Ok(()) => Ok(()),
                Err(keyring::Error::NoEntry) => Err(KeychainError::NotFound(name.to_string())),
                Err(e) => Err(KeychainError::Keyring(e)),
            }
        })
        .await
        .map_err(|e| KeychainError::TaskFailed(e.to_string()))?
    }

    /// Returns the service name used for this keychain access.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

fn canonical_name(name: &str) -> Result<&'static str> {
    names::known(name).ok_or_else(|| KeychainError::UnknownSecret(name.to_string()))
}

impl Default for KeychainAccess {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretSource for KeychainAccess {
    async fn secret(&self, name: &str) -> std::result::Result<Option<String>, ConfigError> {
        Ok(self.retrieve(name).await?)
    }
}
