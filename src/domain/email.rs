//! Email domain types.
//!
//! Represents normalized email messages and their attachments. Field names
//! follow the serialization contract exposed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EmailId, EmailService};

/// A normalized email message.
///
/// Constructed once per fetched message and handed to the caller; never
/// cached or mutated across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    /// Provider-native identifier.
    pub id: EmailId,
    /// Provider this email was retrieved from.
    pub service: EmailService,
    /// Sender address.
    pub from: String,
    /// Primary recipient addresses, in header order.
    pub to: Vec<String>,
    /// Carbon copy recipient addresses, in header order.
    pub cc: Vec<String>,
    /// Blind carbon copy recipient addresses, in header order.
    pub bcc: Vec<String>,
    /// Date and time the email was sent.
    #[serde(rename = "sentDateTime")]
    pub sent_at: DateTime<Utc>,
    /// Subject line, possibly empty.
    pub subject: String,
    /// HTML body if present and non-blank, else plain text, else empty.
    pub body: String,
    /// Attachments in part-tree traversal order.
    pub attachments: Vec<EmailAttachment>,
}

impl Email {
    /// Creates an otherwise empty email carrying only an id and service tag.
    ///
    /// Useful for id-based operations such as delete.
    pub fn with_id(service: EmailService, id: impl Into<EmailId>) -> Self {
        Self {
            id: id.into(),
            service,
            from: String::new(),
            to: vec![],
            cc: vec![],
            bcc: vec![],
            sent_at: Utc::now(),
            subject: String::new(),
            body: String::new(),
            attachments: vec![],
        }
    }
}

/// A file attachment on an email.
///
/// `content` is either the complete standard base64 payload or `None`;
/// it is never partially filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAttachment {
    /// Original filename.
    pub name: String,
    /// MIME type or bare lowercase file extension, depending on the provider.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Declared size in bytes.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Base64 payload, present only when the size is within the ceiling.
    pub content: Option<String>,
}

impl EmailAttachment {
    /// Creates a metadata-only attachment.
    pub fn metadata(name: impl Into<String>, content_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size_bytes,
            content: None,
        }
    }

    /// Returns true if the payload was materialized.
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// Sorts emails by sent time, oldest first.
///
/// Ties are broken by id so the order is deterministic.
pub fn sort_chronologically(emails: &mut [Email]) {
    emails.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then_with(|| a.id.cmp(&b.id)));
}

/// Derives a bare lowercase extension from a filename, or `"unknown"`.
pub fn file_extension(filename: Option<&str>) -> String {
    let Some(name) = filename.map(str::trim).filter(|n| !n.is_empty()) else {
        return "unknown".to_string();
    };
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => name[idx + 1..].to_lowercase(),
        _ => "unknown".to_string(),
    }
}
