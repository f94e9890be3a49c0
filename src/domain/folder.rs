//! Logical folder taxonomy.
//!
//! An [`EmailFolder`] names a folder independently of any provider. Each
//! provider adapter maps it onto its own folder identifiers through the
//! folder resolver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::EmailService;
use crate::config::ConfigError;

/// The kind of folder a logical folder represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderType {
    /// Primary incoming mail.
    Inbox,
    /// Sent mail.
    Sent,
    /// Unsent drafts.
    Drafts,
    /// Spam/junk mail.
    Spam,
    /// Deleted mail.
    Trash,
    /// User-defined or provider-specific folder.
    Custom,
}

impl fmt::Display for FolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FolderType::Inbox => "Inbox",
            FolderType::Sent => "Sent",
            FolderType::Drafts => "Drafts",
            FolderType::Spam => "Spam",
            FolderType::Trash => "Trash",
            FolderType::Custom => "Custom",
        };
        f.write_str(name)
    }
}

impl FromStr for FolderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(FolderType::Inbox),
            "sent" | "sentitems" | "sent items" => Ok(FolderType::Sent),
            "drafts" | "draft" => Ok(FolderType::Drafts),
            "spam" | "junk" | "junkemail" => Ok(FolderType::Spam),
            "trash" | "deleted" | "deleteditems" => Ok(FolderType::Trash),
            "custom" => Ok(FolderType::Custom),
            _ => Err(ConfigError::UnsupportedFolderType(s.to_string())),
        }
    }
}

/// A logical folder bound to one service.
///
/// A `Custom` folder always carries a provider handle; constructing one
/// without it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "FolderSpec")]
pub struct EmailFolder {
    logical_name: String,
    folder_type: FolderType,
    service: EmailService,
    provider_handle: Option<String>,
}

/// Unvalidated wire form of [`EmailFolder`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderSpec {
    logical_name: String,
    folder_type: FolderType,
    service: EmailService,
    #[serde(default)]
    provider_handle: Option<String>,
}

impl TryFrom<FolderSpec> for EmailFolder {
    type Error = ConfigError;

    fn try_from(spec: FolderSpec) -> Result<Self, Self::Error> {
        EmailFolder::new(
            spec.logical_name,
            spec.folder_type,
            spec.service,
            spec.provider_handle,
        )
    }
}

impl EmailFolder {
    /// Creates a folder.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFolderHandle`] for a `Custom` folder
    /// without a non-blank provider handle.
    pub fn new(
        logical_name: impl Into<String>,
        folder_type: FolderType,
        service: EmailService,
        provider_handle: Option<String>,
    ) -> Result<Self, ConfigError> {
        let logical_name = logical_name.into();
        let provider_handle = provider_handle
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        if folder_type == FolderType::Custom && provider_handle.is_none() {
            return Err(ConfigError::MissingFolderHandle(logical_name));
        }

        Ok(Self {
            logical_name,
            folder_type,
            service,
            provider_handle,
        })
    }

    /// Creates a custom folder addressed by a provider-native handle.
    pub fn custom(
        logical_name: impl Into<String>,
        service: EmailService,
        provider_handle: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            logical_name,
            FolderType::Custom,
            service,
            Some(provider_handle.into()),
        )
    }

    /// Creates the standard folder of the given type for a service.
    ///
    /// # Errors
    ///
    /// `Custom` has no standard folder and fails with
    /// [`ConfigError::MissingFolderHandle`].
    pub fn standard(folder_type: FolderType, service: EmailService) -> Result<Self, ConfigError> {
        let (name, handle) = match (folder_type, service) {
            (FolderType::Inbox, EmailService::Gmail) => ("Inbox", "INBOX"),
            (FolderType::Inbox, EmailService::Outlook) => ("Inbox", "Inbox"),
            (FolderType::Inbox, EmailService::Owa) => ("Inbox", "WellKnownFolderName.Inbox"),
            (FolderType::Spam, EmailService::Gmail) => ("Spam", "SPAM"),
            (FolderType::Spam, EmailService::Outlook) => ("Junk Email", "JunkEmail"),
            (FolderType::Spam, EmailService::Owa) => {
                ("Junk Email", "WellKnownFolderName.JunkEmail")
            }
            (FolderType::Sent, EmailService::Gmail) => ("Sent", "SENT"),
            (FolderType::Sent, EmailService::Outlook) => ("Sent Items", "SentItems"),
            (FolderType::Sent, EmailService::Owa) => {
                ("Sent Items", "WellKnownFolderName.SentItems")
            }
            (FolderType::Drafts, EmailService::Gmail) => ("Drafts", "DRAFT"),
            (FolderType::Drafts, EmailService::Outlook) => ("Drafts", "Drafts"),
            (FolderType::Drafts, EmailService::Owa) => ("Drafts", "WellKnownFolderName.Drafts"),
            (FolderType::Trash, EmailService::Gmail) => ("Trash", "TRASH"),
            (FolderType::Trash, EmailService::Outlook) => ("Deleted Items", "DeletedItems"),
            (FolderType::Trash, EmailService::Owa) => {
                ("Deleted Items", "WellKnownFolderName.DeletedItems")
            }
            (FolderType::Custom, _) => {
                return Err(ConfigError::MissingFolderHandle("Custom".to_string()))
            }
        };
        Self::new(name, folder_type, service, Some(handle.to_string()))
    }

    /// The inbox of a service.
    pub fn inbox(service: EmailService) -> Self {
        Self {
            logical_name: "Inbox".to_string(),
            folder_type: FolderType::Inbox,
            service,
            provider_handle: Some(
                match service {
                    EmailService::Gmail => "INBOX",
                    EmailService::Outlook => "Inbox",
                    EmailService::Owa => "WellKnownFolderName.Inbox",
                }
                .to_string(),
            ),
        }
    }

    /// Display name of the folder.
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Kind of folder.
    pub fn folder_type(&self) -> FolderType {
        self.folder_type
    }

    /// Service the folder belongs to.
    pub fn service(&self) -> EmailService {
        self.service
    }

    /// Provider-native handle, if any.
    pub fn provider_handle(&self) -> Option<&str> {
        self.provider_handle.as_deref()
    }
}

impl fmt::Display for EmailFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {}",
            self.logical_name, self.folder_type, self.service
        )
    }
}
