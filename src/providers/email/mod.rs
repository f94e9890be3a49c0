//! Mail backend adapters.
//!
//! This module contains the [`MailAdapter`] trait and one implementation per
//! backend:
//!
//! - [`GmailAdapter`] - Gmail REST API with OAuth 2.0
//! - [`GraphAdapter`] - Microsoft Graph REST API with OAuth 2.0
//! - [`EwsAdapter`] - Exchange Web Services through a caller-supplied port
//!
//! # Architecture
//!
//! Each adapter is generic over a port trait ([`GmailPort`], [`GraphPort`],
//! [`EwsPort`]) that performs the remote calls. The adapter owns the parts
//! that are the same on every backend:
//!
//! - [`FolderResolver`] turns a logical folder into a native one
//! - [`RateLimiter`] spaces out calls on the session
//! - [`AttachmentPolicy`] decides which attachment payloads are kept
//! - [`MessageParser`] walks Gmail's MIME part tree
//!
//! # Example
//!
//! ```ignore
//! use mailnorm::config::StaticSecrets;
//! use mailnorm::domain::{EmailService, RetrievalRequest};
//! use mailnorm::providers::email::{AdapterOptions, GmailAdapter, MailAdapter};
//! use std::time::Duration;
//!
//! async fn first_batch(secrets: &StaticSecrets) {
//!     let options = AdapterOptions::for_service(EmailService::Gmail);
//!     let adapter = GmailAdapter::connect(secrets, options, Duration::from_secs(120))
//!         .await
//!         .expect("failed to connect");
//!
//!     let result = adapter.fetch_batch(&RetrievalRequest::new(0, 50)).await;
//!     println!("{} emails: {}", result.count, result.diagnostic);
//! }
//! ```

mod attachments;
mod ews;
mod folders;
mod gmail;
mod graph;
mod http;
mod parser;
mod rate_limit;
mod traits;

pub use attachments::{should_inline_content, AttachmentPolicy};
pub use ews::{
    DeleteMode, EwsAdapter, EwsAttachment, EwsBody, EwsFileAttachment, EwsItemSummary,
    EwsMailbox, EwsMessage, EwsPort, EwsResponseMessage, FindItemsPage, ItemSort, ResponseClass,
};
pub use folders::{FolderResolver, ProviderFolder, WellKnownFolder};
pub use gmail::{
    GmailAdapter, GmailAttachmentBody, GmailMessage, GmailPort, GmailSession, MessageListPage,
    MessageRef,
};
pub use graph::{
    GraphAdapter, GraphAttachment, GraphEmailAddress, GraphItemBody, GraphMessage, GraphPage,
    GraphPort, GraphRecipient, GraphSession,
};
pub use parser::{
    parse_address_list, parse_date_header, parse_timestamp, AttachmentSource, MessageHeaders,
    MessageParser, MimePart, ParsedMessage, PartBody, PartHeader,
};
pub use rate_limit::RateLimiter;
pub use traits::{
    classify_delete_error, failure_diagnostic, precheck_delete, AdapterOptions, DeleteOutcome,
    MailAdapter, ProviderError, Result,
};
