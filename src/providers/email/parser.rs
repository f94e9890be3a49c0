//! MIME part tree walking.
//!
//! [`MessageParser`] turns a provider's part tree into headers, a body and a
//! list of attachments. The tree shape matches the Gmail `payload` resource:
//! a root part with headers and nested `parts`, each leaf carrying either
//! inline base64 `data` or a detached `attachmentId`.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::attachments::{decode_text, to_standard_base64, AttachmentPolicy};
use super::Result;
use crate::domain::EmailAttachment;

const DEFAULT_ATTACHMENT_TYPE: &str = "application/octet-stream";

/// One node of a MIME part tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MimePart {
    pub part_id: Option<String>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
    pub headers: Vec<PartHeader>,
    pub body: Option<PartBody>,
    pub parts: Vec<MimePart>,
}

impl MimePart {
    /// Looks up a header, ignoring case. The first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn is_leaf(&self) -> bool {
        self.parts.is_empty()
    }

    fn mime_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or("")
    }

    fn attachment_filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.trim().is_empty())
    }
}

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartHeader {
    pub name: String,
    pub value: String,
}

/// Payload of a part: inline data, a detached attachment id, or both absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartBody {
    pub attachment_id: Option<String>,
    pub size: u64,
    pub data: Option<String>,
}

/// Fetches detached attachment payloads.
///
/// Implementations pace their remote calls; the parser calls
/// `fetch_attachment` at most once per attachment.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Returns the attachment's URL-safe base64 payload.
    async fn fetch_attachment(&self, attachment_id: &str) -> Result<String>;
}

/// Header fields extracted from the root part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub date: Option<String>,
}

/// Output of [`MessageParser::parse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMessage {
    pub headers: MessageHeaders,
    pub html_body: Option<String>,
    pub plain_body: Option<String>,
    pub attachments: Vec<EmailAttachment>,
}

impl ParsedMessage {
    /// HTML body if non-blank, else plain text, else empty.
    pub fn body(&self) -> String {
        self.html_body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .or_else(|| self.plain_body.as_deref().filter(|b| !b.trim().is_empty()))
            .unwrap_or("")
            .to_string()
    }
}

/// Walks part trees under one attachment policy.
#[derive(Debug, Clone, Copy)]
pub struct MessageParser {
    policy: AttachmentPolicy,
}

impl MessageParser {
    pub fn new(policy: AttachmentPolicy) -> Self {
        Self { policy }
    }

    /// Parses a part tree depth-first.
    ///
    /// Children are visited in order. A later non-blank text part replaces an
    /// earlier one of the same type. Any leaf with a filename is an
    /// attachment. Decode or fetch failures affect only the part that raised
    /// them.
    pub async fn parse(&self, root: &MimePart, source: &dyn AttachmentSource) -> ParsedMessage {
        let mut parsed = ParsedMessage {
            headers: extract_headers(root),
            ..Default::default()
        };

        let mut stack = vec![root];
        while let Some(part) = stack.pop() {
            if !part.is_leaf() {
                stack.extend(part.parts.iter().rev());
                continue;
            }

            if let Some(filename) = part.attachment_filename() {
                let attachment = self.attachment(part, filename, source).await;
                parsed.attachments.push(attachment);
                continue;
            }

            let slot = match part.mime_type().to_ascii_lowercase().as_str() {
                "text/plain" => &mut parsed.plain_body,
                "text/html" => &mut parsed.html_body,
                _ => continue,
            };
            let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) else {
                continue;
            };
            match decode_text(data) {
                Ok(text) if !text.trim().is_empty() => *slot = Some(text),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(part_id = ?part.part_id, error = %e, "Skipping undecodable body part");
                }
            }
        }

        parsed
    }

    async fn attachment(
        &self,
        part: &MimePart,
        filename: &str,
        source: &dyn AttachmentSource,
    ) -> EmailAttachment {
        let content_type = part
            .mime_type
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_ATTACHMENT_TYPE);
        let body = part.body.clone().unwrap_or_default();

        if !self.policy.should_inline(body.size) {
            tracing::debug!(
                filename,
                size = body.size,
                ceiling = self.policy.ceiling_bytes(),
                "Attachment over ceiling; metadata only"
            );
            return self.policy.materialize(filename, content_type, body.size, None);
        }

        let raw = match (body.data, body.attachment_id) {
            (Some(data), _) => Some(data),
            (None, Some(attachment_id)) => match source.fetch_attachment(&attachment_id).await {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::warn!(filename, error = %e, "Failed to fetch attachment");
                    None
                }
            },
            (None, None) => None,
        };

        let content = raw.and_then(|data| match to_standard_base64(&data) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::warn!(filename, error = %e, "Failed to decode attachment");
                None
            }
        });

        self.policy
            .materialize(filename, content_type, body.size, content)
    }
}

fn extract_headers(root: &MimePart) -> MessageHeaders {
    let list = |name: &str| root.header(name).map(parse_address_list).unwrap_or_default();
    MessageHeaders {
        from: root
            .header("From")
            .map(|v| {
                parse_address_list(v)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| v.trim().to_string())
            })
            .unwrap_or_default(),
        to: list("To"),
        cc: list("Cc"),
        bcc: list("Bcc"),
        subject: root.header("Subject").unwrap_or_default().to_string(),
        date: root.header("Date").map(str::to_string),
    }
}

/// Parses an address header into bare addresses, flattening groups.
///
/// Falls back to splitting on commas when the header is not valid RFC 5322.
pub fn parse_address_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return vec![];
    }
    match mailparse::addrparse(value) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                mailparse::MailAddr::Single(info) => vec![info.addr.clone()],
                mailparse::MailAddr::Group(group) => {
                    group.addrs.iter().map(|info| info.addr.clone()).collect()
                }
            })
            .filter(|a| !a.trim().is_empty())
            .collect(),
        Err(_) => value
            .split(',')
            .map(bare_address)
            .filter(|a| !a.is_empty())
            .collect(),
    }
}

fn bare_address(entry: &str) -> String {
    let entry = entry.trim();
    match (entry.find('<'), entry.rfind('>')) {
        (Some(start), Some(end)) if start < end => entry[start + 1..end].trim().to_string(),
        _ => entry.trim_matches('"').to_string(),
    }
}

/// Parses a `Date` header. Returns `None` when no format matches.
pub fn parse_date_header(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if looks_like_mail_date(value) {
        if let Ok(secs) = mailparse::dateparse(value) {
            if let Some(parsed) = Utc.timestamp_opt(secs, 0).single() {
                return Some(parsed);
            }
        }
    }
    parse_timestamp(value)
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// `mailparse::dateparse` yields the epoch for input it cannot read, so it
/// only sees values carrying a day, a month name and a four-digit year.
fn looks_like_mail_date(value: &str) -> bool {
    let tokens: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    let is_digits = |t: &str, len: std::ops::RangeInclusive<usize>| {
        len.contains(&t.len()) && t.bytes().all(|b| b.is_ascii_digit())
    };

    let has_day = tokens.iter().any(|t| is_digits(*t, 1..=2));
    let has_year = tokens.iter().any(|t| is_digits(*t, 4..=4));
    let has_month = tokens.iter().any(|t| {
        t.get(..3)
            .is_some_and(|prefix| MONTHS.iter().any(|m| prefix.eq_ignore_ascii_case(m)))
    });
    has_day && has_month && has_year
}

/// Parses an ISO 8601 / RFC 3339 timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Exchange omits the offset on some servers.
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
