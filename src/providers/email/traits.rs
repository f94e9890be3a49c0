//! Mail adapter trait definition.
//!
//! This module defines the [`MailAdapter`] trait which abstracts over the
//! supported mail backends (Gmail REST, Graph REST, EWS). Every adapter turns
//! one backend's proprietary message shape into normalized
//! [`Email`](crate::domain::Email) values.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ConfigError;
use crate::domain::{Email, EmailService, RetrievalRequest, RetrievalResult};

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Non-success response from the provider API.
    #[error("provider API error ({status}): {message}")]
    Api {
        /// HTTP status or provider response code.
        status: u16,
        /// Response body or provider message.
        message: String,
    },

    /// Response could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A remote call did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A provider message could not be normalized.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Session or folder configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Returns true for errors reported by the provider API itself.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            ProviderError::Authentication(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::NotFound(_)
                | ProviderError::InvalidRequest(_)
                | ProviderError::Api { .. }
        )
    }

    /// Returns true for authentication failures, including API errors whose
    /// status or text says unauthorized.
    pub fn is_authentication_failure(&self) -> bool {
        match self {
            ProviderError::Authentication(_) => true,
            ProviderError::Api { status: 401, .. } => true,
            other => {
                let text = other.to_string().to_ascii_lowercase();
                text.contains("unauthorized") || text.contains("401")
            }
        }
    }
}

/// Result of a delete-by-id call.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The provider accepted the delete.
    Deleted,
    /// The delete was refused before or by the provider.
    Rejected(String),
    /// The provider API reported an error.
    Failed(ProviderError),
}

impl DeleteOutcome {
    /// Returns true if the email was deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted)
    }
}

impl std::fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteOutcome::Deleted => f.write_str("deleted"),
            DeleteOutcome::Rejected(reason) => write!(f, "rejected: {}", reason),
            DeleteOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Per-adapter tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Largest attachment, in bytes, whose content is materialized.
    pub attachment_ceiling: u64,
    /// Minimum spacing between remote calls on one session.
    pub min_call_spacing: Duration,
}

impl AdapterOptions {
    /// Default options for a provider.
    pub fn for_service(service: EmailService) -> Self {
        crate::config::Settings::default().adapter_options(service)
    }
}

/// Trait for mail backend adapters.
///
/// Implementors own their session and rate limiter. Both operations report
/// failures through their return value; they never panic on provider errors.
///
/// # Example
///
/// ```ignore
/// use mailnorm::domain::RetrievalRequest;
/// use mailnorm::providers::email::MailAdapter;
///
/// async fn first_page(adapter: &dyn MailAdapter) {
///     let result = adapter.fetch_batch(&RetrievalRequest::new(0, 50)).await;
///     for email in result.emails {
///         println!("{}: {}", email.from, email.subject);
///     }
/// }
/// ```
#[async_trait]
pub trait MailAdapter: Send + Sync {
    /// Returns the service this adapter talks to.
    fn service(&self) -> EmailService;

    /// Retrieves one batch of emails in ascending sent-time order.
    ///
    /// Returns `success = false` with a diagnostic when the folder cannot be
    /// resolved, listing fails, or authentication fails. Individual messages
    /// that fail to convert are skipped.
    async fn fetch_batch(&self, request: &RetrievalRequest) -> RetrievalResult;

    /// Deletes the email with the given id.
    ///
    /// Rejected without a remote call when the email belongs to another
    /// service or has an empty id.
    async fn delete_by_id(&self, email: &Email) -> DeleteOutcome;
}

/// Checks the preconditions shared by every adapter's delete.
///
/// Returns `Some(Rejected)` when no remote call should be made.
pub fn precheck_delete(service: EmailService, email: &Email) -> Option<DeleteOutcome> {
    if email.service != service {
        return Some(DeleteOutcome::Rejected(format!(
            "email belongs to {}, not {}",
            email.service, service
        )));
    }
    if email.id.is_blank() {
        return Some(DeleteOutcome::Rejected("email id is empty".to_string()));
    }
    None
}

/// Maps a delete error to an outcome: API errors fail, anything else is
/// rejected.
pub fn classify_delete_error(err: ProviderError) -> DeleteOutcome {
    if err.is_api_error() {
        DeleteOutcome::Failed(err)
    } else {
        DeleteOutcome::Rejected(err.to_string())
    }
}

/// Builds the diagnostic for an aborted batch.
pub fn failure_diagnostic(service: EmailService, err: &ProviderError) -> String {
    if err.is_authentication_failure() {
        return match service {
            EmailService::Outlook => {
                "Authentication failed. Please check Outlook credentials and ensure proper consent."
                    .to_string()
            }
            other => format!("Authentication failed. Please check {} credentials.", other),
        };
    }
    format!("Failed to retrieve emails: {}", err)
}
