//! Named secrets and per-provider credentials.
//!
//! Provider sessions never read secrets directly. They receive a credentials
//! struct assembled here, so a missing secret fails before any network call.

use async_trait::async_trait;
use std::collections::HashMap;
use url::Url;

use super::ConfigError;

/// Well-known secret names.
pub mod names {
    pub const GOOGLE_CLIENT_ID: &str = "googleClientId";
    pub const GOOGLE_CLIENT_SECRET: &str = "googleClientSecret";
    pub const GOOGLE_REFRESH_TOKEN: &str = "googleRefreshToken";
    pub const GOOGLE_MAILBOX: &str = "googleMailbox";
    pub const OUTLOOK_CLIENT_ID: &str = "outlookClientId";
    pub const OUTLOOK_SECRET: &str = "outlookSecret";
    pub const OUTLOOK_REFRESH_TOKEN: &str = "outlookRefreshToken";
    pub const OWA_SERVICE_URI: &str = "owaServiceURI";
    pub const OWA_EMAIL_ADDRESS: &str = "owaEmailAddress";
    pub const OWA_PASSWORD: &str = "owaPassword";

    pub const ALL: [&str; 10] = [
        GOOGLE_CLIENT_ID,
        GOOGLE_CLIENT_SECRET,
        GOOGLE_REFRESH_TOKEN,
        GOOGLE_MAILBOX,
        OUTLOOK_CLIENT_ID,
        OUTLOOK_SECRET,
        OUTLOOK_REFRESH_TOKEN,
        OWA_SERVICE_URI,
        OWA_EMAIL_ADDRESS,
        OWA_PASSWORD,
    ];

    /// Returns the canonical spelling of a known secret name, ignoring case.
    pub fn known(name: &str) -> Option<&'static str> {
        ALL.iter()
            .copied()
            .find(|known| known.eq_ignore_ascii_case(name.trim()))
    }
}

/// A source of named secret strings.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Looks up a secret, returning `None` when it is not stored.
    async fn secret(&self, name: &str) -> Result<Option<String>, ConfigError>;

    /// Looks up a secret that must be present and non-blank.
    async fn require(&self, name: &str) -> Result<String, ConfigError> {
        match self.secret(name).await? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingSecret(name.to_string())),
        }
    }
}

/// In-memory secrets, for tests and environment-driven setups.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Collects every known secret name present in the process environment.
    ///
    /// `googleClientId` is read from `MAILNORM_GOOGLECLIENTID`.
    pub fn from_env() -> Self {
        let values = names::ALL
            .iter()
            .filter_map(|name| {
                let var = format!("MAILNORM_{}", name.to_ascii_uppercase());
                std::env::var(var).ok().map(|v| (name.to_string(), v))
            })
            .collect();
        Self { values }
    }
}

#[async_trait]
impl SecretSource for StaticSecrets {
    async fn secret(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(name).cloned())
    }
}

/// OAuth client credentials for the Gmail REST session.
#[derive(Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Mailbox user id; `me` when not configured.
    pub mailbox: String,
}

impl GmailCredentials {
    pub async fn from_secrets(secrets: &dyn SecretSource) -> Result<Self, ConfigError> {
        let mailbox = secrets
            .secret(names::GOOGLE_MAILBOX)
            .await?
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "me".to_string());
        Ok(Self {
            client_id: secrets.require(names::GOOGLE_CLIENT_ID).await?,
            client_secret: secrets.require(names::GOOGLE_CLIENT_SECRET).await?,
            refresh_token: secrets.require(names::GOOGLE_REFRESH_TOKEN).await?,
            mailbox,
        })
    }
}

impl std::fmt::Debug for GmailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailCredentials")
            .field("client_id", &self.client_id)
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}

/// OAuth client credentials for the Graph REST session.
#[derive(Clone)]
pub struct GraphCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl GraphCredentials {
    pub async fn from_secrets(secrets: &dyn SecretSource) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: secrets.require(names::OUTLOOK_CLIENT_ID).await?,
            client_secret: secrets.require(names::OUTLOOK_SECRET).await?,
            refresh_token: secrets.require(names::OUTLOOK_REFRESH_TOKEN).await?,
        })
    }
}

impl std::fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Basic credentials and endpoint for an Exchange Web Services session.
#[derive(Clone)]
pub struct EwsCredentials {
    pub endpoint: Url,
    pub email_address: String,
    pub password: String,
}

impl EwsCredentials {
    pub async fn from_secrets(secrets: &dyn SecretSource) -> Result<Self, ConfigError> {
        let uri = secrets.require(names::OWA_SERVICE_URI).await?;
        Ok(Self {
            endpoint: parse_endpoint(&uri)?,
            email_address: secrets.require(names::OWA_EMAIL_ADDRESS).await?,
            password: secrets.require(names::OWA_PASSWORD).await?,
        })
    }
}

impl std::fmt::Debug for EwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EwsCredentials")
            .field("endpoint", &self.endpoint.as_str())
            .field("email_address", &self.email_address)
            .finish_non_exhaustive()
    }
}

/// Parses an absolute http(s) endpoint.
pub fn parse_endpoint(uri: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(uri.trim()).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
