//! Logical folder to provider folder mapping.

use std::fmt;

use crate::config::ConfigError;
use crate::domain::{EmailFolder, EmailService, FolderType};

/// A provider's built-in folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownFolder {
    Inbox,
    SentItems,
    Drafts,
    Junk,
    Deleted,
}

impl WellKnownFolder {
    const ALL: [WellKnownFolder; 5] = [
        WellKnownFolder::Inbox,
        WellKnownFolder::SentItems,
        WellKnownFolder::Drafts,
        WellKnownFolder::Junk,
        WellKnownFolder::Deleted,
    ];

    fn from_folder_type(folder_type: FolderType) -> Option<Self> {
        match folder_type {
            FolderType::Inbox => Some(WellKnownFolder::Inbox),
            FolderType::Sent => Some(WellKnownFolder::SentItems),
            FolderType::Drafts => Some(WellKnownFolder::Drafts),
            FolderType::Spam => Some(WellKnownFolder::Junk),
            FolderType::Trash => Some(WellKnownFolder::Deleted),
            FolderType::Custom => None,
        }
    }

    /// Gmail system label id.
    pub fn gmail_label(self) -> &'static str {
        match self {
            WellKnownFolder::Inbox => "INBOX",
            WellKnownFolder::SentItems => "SENT",
            WellKnownFolder::Drafts => "DRAFT",
            WellKnownFolder::Junk => "SPAM",
            WellKnownFolder::Deleted => "TRASH",
        }
    }

    /// Graph well-known folder name.
    pub fn graph_name(self) -> &'static str {
        match self {
            WellKnownFolder::Inbox => "inbox",
            WellKnownFolder::SentItems => "sentitems",
            WellKnownFolder::Drafts => "drafts",
            WellKnownFolder::Junk => "junkemail",
            WellKnownFolder::Deleted => "deleteditems",
        }
    }

    /// EWS distinguished folder id.
    pub fn ews_distinguished_id(self) -> &'static str {
        match self {
            WellKnownFolder::Inbox => "inbox",
            WellKnownFolder::SentItems => "sentitems",
            WellKnownFolder::Drafts => "drafts",
            WellKnownFolder::Junk => "junkemail",
            WellKnownFolder::Deleted => "deleteditems",
        }
    }

    fn ews_name(self) -> &'static str {
        match self {
            WellKnownFolder::Inbox => "Inbox",
            WellKnownFolder::SentItems => "SentItems",
            WellKnownFolder::Drafts => "Drafts",
            WellKnownFolder::Junk => "JunkEmail",
            WellKnownFolder::Deleted => "DeletedItems",
        }
    }

    fn from_marker(service: EmailService, handle: &str) -> Option<Self> {
        let handle = handle.trim();
        match service {
            EmailService::Gmail => Self::ALL.into_iter().find(|f| f.gmail_label() == handle),
            EmailService::Outlook => Self::ALL
                .into_iter()
                .find(|f| f.graph_name().eq_ignore_ascii_case(handle)),
            EmailService::Owa => {
                let name = handle.strip_prefix("WellKnownFolderName.").unwrap_or(handle);
                Self::ALL
                    .into_iter()
                    .find(|f| f.ews_name().eq_ignore_ascii_case(name))
            }
        }
    }
}

/// A resolved, provider-native folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderFolder {
    /// A built-in folder.
    WellKnown(WellKnownFolder),
    /// A folder addressed by its provider id.
    Custom(String),
}

impl ProviderFolder {
    /// Native identifier for list calls on the given service.
    pub fn native_id(&self, service: EmailService) -> &str {
        match self {
            ProviderFolder::WellKnown(folder) => match service {
                EmailService::Gmail => folder.gmail_label(),
                EmailService::Outlook => folder.graph_name(),
                EmailService::Owa => folder.ews_distinguished_id(),
            },
            ProviderFolder::Custom(id) => id,
        }
    }
}

impl fmt::Display for ProviderFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFolder::WellKnown(folder) => write!(f, "{:?}", folder),
            ProviderFolder::Custom(id) => write!(f, "custom:{}", id),
        }
    }
}

/// Maps logical folders onto one provider's folders.
#[derive(Debug, Clone, Copy)]
pub struct FolderResolver {
    service: EmailService,
}

impl FolderResolver {
    pub fn new(service: EmailService) -> Self {
        Self { service }
    }

    /// Resolves a logical folder.
    ///
    /// A handle naming one of the provider's well-known folders wins over the
    /// folder type. Otherwise standard types map through a fixed table and
    /// `Custom` uses its handle verbatim.
    pub fn resolve(&self, folder: &EmailFolder) -> Result<ProviderFolder, ConfigError> {
        if folder.service() != self.service {
            return Err(ConfigError::FolderServiceMismatch {
                folder: folder.logical_name().to_string(),
                folder_service: folder.service().to_string(),
                target: self.service.to_string(),
            });
        }

        if let Some(handle) = folder.provider_handle() {
            if let Some(well_known) = WellKnownFolder::from_marker(self.service, handle) {
                return Ok(ProviderFolder::WellKnown(well_known));
            }
        }

        if let Some(well_known) = WellKnownFolder::from_folder_type(folder.folder_type()) {
            return Ok(ProviderFolder::WellKnown(well_known));
        }

        match folder.provider_handle() {
            Some(handle) if !handle.trim().is_empty() => {
                Ok(ProviderFolder::Custom(handle.trim().to_string()))
            }
            _ => Err(ConfigError::MissingFolderHandle(
                folder.logical_name().to_string(),
            )),
        }
    }
}
