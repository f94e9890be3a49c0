//! Batch retrieval request and result envelope.

use serde::{Deserialize, Serialize};

use super::{Email, EmailFolder, EmailService};
use crate::config::ConfigError;

/// Diagnostic reported when a batch returned fewer emails than requested.
pub const LAST_BATCH_MARKER: &str = "Last batch retrieved";

/// One bounded retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    /// Number of messages to skip in the folder's sent-time order.
    #[serde(default)]
    pub start_index: usize,
    /// Maximum number of messages to return.
    #[serde(alias = "numberOfEmails")]
    pub count: usize,
    /// Folder to read from; `None` means the target service's inbox.
    #[serde(default)]
    pub folder: Option<EmailFolder>,
}

impl RetrievalRequest {
    /// Creates a request for the inbox.
    pub fn new(start_index: usize, count: usize) -> Self {
        Self {
            start_index,
            count,
            folder: None,
        }
    }

    /// Sets the folder to read from.
    pub fn with_folder(mut self, folder: EmailFolder) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Returns the folder to read, defaulting to the service's inbox.
    pub fn effective_folder(&self, service: EmailService) -> EmailFolder {
        self.folder
            .clone()
            .unwrap_or_else(|| EmailFolder::inbox(service))
    }

    /// Checks the request bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "count".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Outcome of one batch retrieval.
///
/// `count` always equals `emails.len()`, and a failed result never carries
/// emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    /// Whether the batch completed.
    pub success: bool,
    /// Human-readable status or failure reason.
    #[serde(rename = "message", alias = "diagnostic")]
    pub diagnostic: String,
    /// Number of emails returned.
    pub count: usize,
    /// Normalized emails in ascending sent-time order.
    pub emails: Vec<Email>,
    /// Service the batch was read from.
    pub service: EmailService,
}

impl RetrievalResult {
    /// Builds a successful result.
    ///
    /// The diagnostic is [`LAST_BATCH_MARKER`] when fewer emails than
    /// `requested` were converted, and empty for a full batch.
    pub fn batch(service: EmailService, emails: Vec<Email>, requested: usize) -> Self {
        let diagnostic = if emails.len() < requested {
            LAST_BATCH_MARKER.to_string()
        } else {
            String::new()
        };
        Self {
            success: true,
            diagnostic,
            count: emails.len(),
            emails,
            service,
        }
    }

    /// Builds a failed result.
    pub fn failure(service: EmailService, diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        Self {
            success: false,
            diagnostic: if diagnostic.trim().is_empty() {
                "Retrieval failed".to_string()
            } else {
                diagnostic
            },
            count: 0,
            emails: vec![],
            service,
        }
    }

    /// Returns true if this is the final page of the folder.
    pub fn is_last_batch(&self) -> bool {
        self.success && self.diagnostic == LAST_BATCH_MARKER
    }

    /// Restores the envelope invariants after an adapter returned.
    pub fn enforce_invariants(mut self) -> Self {
        if !self.success {
            self.emails.clear();
            if self.diagnostic.trim().is_empty() {
                self.diagnostic = "Retrieval failed".to_string();
            }
        }
        self.count = self.emails.len();
        self
    }
}
