//! Core identifier and tag types for domain entities.
//!
//! These newtype wrappers and tags provide type safety for provider-native
//! identifiers, preventing accidental mixing of ids across providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Provider-native identifier of an email.
///
/// Opaque outside the provider that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailId(pub String);

impl EmailId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EmailId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmailId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Mail backend an email or folder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailService {
    /// Gmail REST API.
    Gmail,
    /// Microsoft Graph mail API.
    Outlook,
    /// Exchange Web Services (on-premises OWA).
    #[serde(rename = "OWA")]
    Owa,
}

impl EmailService {
    /// All supported services.
    pub const ALL: [EmailService; 3] = [EmailService::Gmail, EmailService::Outlook, EmailService::Owa];

    /// Returns the canonical display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailService::Gmail => "Gmail",
            EmailService::Outlook => "Outlook",
            EmailService::Owa => "OWA",
        }
    }
}

impl fmt::Display for EmailService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailService {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gmail" | "google" => Ok(EmailService::Gmail),
            "outlook" | "graph" => Ok(EmailService::Outlook),
            "owa" | "ews" | "exchange" => Ok(EmailService::Owa),
            _ => Err(ConfigError::UnsupportedService(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_id_display() {
        let id = EmailId::from("18c2f0a1b2");
        assert_eq!(id.to_string(), "18c2f0a1b2");
    }

    #[test]
    fn email_id_blank() {
        assert!(EmailId::from("").is_blank());
        assert!(EmailId::from("  ").is_blank());
        assert!(!EmailId::from("abc").is_blank());
    }

    #[test]
    fn email_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&EmailId::from("msg-1")).unwrap();
        assert_eq!(json, "\"msg-1\"");
    }

    #[test]
    fn service_serialization_names() {
        assert_eq!(serde_json::to_string(&EmailService::Gmail).unwrap(), "\"Gmail\"");
        assert_eq!(serde_json::to_string(&EmailService::Outlook).unwrap(), "\"Outlook\"");
        assert_eq!(serde_json::to_string(&EmailService::Owa).unwrap(), "\"OWA\"");

        let owa: EmailService = serde_json::from_str("\"OWA\"").unwrap();
        assert_eq!(owa, EmailService::Owa);
    }

    #[test]
    fn service_from_str_aliases() {
        assert_eq!("gmail".parse::<EmailService>().unwrap(), EmailService::Gmail);
        assert_eq!("Graph".parse::<EmailService>().unwrap(), EmailService::Outlook);
        assert_eq!("EWS".parse::<EmailService>().unwrap(), EmailService::Owa);
        assert!(matches!(
            "imap".parse::<EmailService>(),
            Err(ConfigError::UnsupportedService(_))
        ));
    }
}
