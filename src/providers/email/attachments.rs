//! Attachment materialization policy and base64 helpers.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;

use crate::domain::EmailAttachment;

/// Standard alphabet, tolerant of missing or present padding.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Returns true when an attachment of `size_bytes` may carry its content.
pub fn should_inline_content(size_bytes: u64, ceiling_bytes: u64) -> bool {
    size_bytes <= ceiling_bytes
}

/// Decides which attachments carry content for one retrieval session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    ceiling_bytes: u64,
}

impl AttachmentPolicy {
    pub fn new(ceiling_bytes: u64) -> Self {
        Self { ceiling_bytes }
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }

    pub fn should_inline(&self, size_bytes: u64) -> bool {
        should_inline_content(size_bytes, self.ceiling_bytes)
    }

    /// Builds an attachment, dropping `content` when the size exceeds the
    /// ceiling.
    pub fn materialize(
        &self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: u64,
        content: Option<String>,
    ) -> EmailAttachment {
        let mut attachment = EmailAttachment::metadata(name, content_type, size_bytes);
        if self.should_inline(size_bytes) {
            attachment.content = content;
        }
        attachment
    }
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new(1_048_576)
    }
}

/// Rewrites URL-safe base64 into the standard alphabet.
pub fn normalize_url_safe(data: &str) -> String {
    data.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}

/// Decodes URL-safe or standard base64, padding optional.
pub fn decode_url_safe(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    LENIENT_STANDARD.decode(normalize_url_safe(data))
}

/// Re-encodes URL-safe base64 as padded standard base64.
pub fn to_standard_base64(data: &str) -> Result<String, base64::DecodeError> {
    decode_url_safe(data).map(|bytes| BASE64_STANDARD.encode(bytes))
}

/// Decodes a base64 body to text, replacing invalid UTF-8.
pub fn decode_text(data: &str) -> Result<String, base64::DecodeError> {
    decode_url_safe(data).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
