//! Domain layer types for mailnorm.
//!
//! This module contains the provider-agnostic types every adapter produces:
//! normalized emails and attachments, logical folders, and the batch
//! request/result envelope.

mod email;
mod folder;
mod retrieval;
mod types;

pub use email::{file_extension, sort_chronologically, Email, EmailAttachment};
pub use folder::{EmailFolder, FolderType};
pub use retrieval::{RetrievalRequest, RetrievalResult, LAST_BATCH_MARKER};
pub use types::{EmailId, EmailService};
