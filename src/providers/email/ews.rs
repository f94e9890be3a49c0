//! Exchange Web Services adapter.
//!
//! No SOAP transport ships with this crate. Callers supply an [`EwsPort`]
//! that speaks to their Exchange server and hands back the item shapes
//! defined here. The adapter asks `FindItem` for `DateTimeSent` ascending
//! and still sorts the batch afterwards, since not every server honors the
//! requested order.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::attachments::AttachmentPolicy;
use super::folders::{FolderResolver, ProviderFolder};
use super::parser::parse_timestamp;
use super::rate_limit::RateLimiter;
use super::{
    classify_delete_error, failure_diagnostic, precheck_delete, AdapterOptions, DeleteOutcome,
    MailAdapter, Result,
};
use crate::domain::{
    file_extension, sort_chronologically, Email, EmailAttachment, EmailService, RetrievalRequest,
    RetrievalResult,
};

const MESSAGE_ITEM_CLASS: &str = "IPM.Note";

/// Sort order requested from `FindItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSort {
    /// Schema property to order by.
    pub field: &'static str,
    pub ascending: bool,
}

impl ItemSort {
    /// Oldest sent first.
    pub const DATE_TIME_SENT_ASC: ItemSort = ItemSort {
        field: "item:DateTimeSent",
        ascending: true,
    };
}

/// `DeleteItem` disposal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteMode {
    HardDelete,
    SoftDelete,
    MoveToDeletedItems,
}

/// One page of `FindItem` results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FindItemsPage {
    pub items: Vec<EwsItemSummary>,
    pub more_available: bool,
    pub next_offset: Option<usize>,
}

/// Item as returned by `FindItem` (id-only shape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EwsItemSummary {
    pub item_id: String,
    pub item_class: Option<String>,
}

impl EwsItemSummary {
    fn is_message(&self) -> bool {
        self.item_class.as_deref().is_some_and(|class| {
            class
                .get(..MESSAGE_ITEM_CLASS.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MESSAGE_ITEM_CLASS))
        })
    }
}

/// Message as returned by `GetItem` with body and attachments loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EwsMessage {
    pub item_id: String,
    pub item_class: Option<String>,
    pub subject: Option<String>,
    pub from: Option<EwsMailbox>,
    pub to_recipients: Vec<EwsMailbox>,
    pub cc_recipients: Vec<EwsMailbox>,
    pub bcc_recipients: Vec<EwsMailbox>,
    pub date_time_sent: Option<String>,
    pub date_time_received: Option<String>,
    pub body: Option<EwsBody>,
    pub attachments: Vec<EwsAttachment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EwsMailbox {
    pub name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EwsBody {
    /// `HTML` or `Text`.
    pub body_type: Option<String>,
    pub text: Option<String>,
}

/// Attachment metadata on a loaded message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EwsAttachment {
    pub attachment_id: Option<String>,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    /// False for item attachments (embedded messages, contacts, ...).
    pub is_file: bool,
}

/// `GetAttachment` result for a file attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EwsFileAttachment {
    pub attachment_id: String,
    pub name: Option<String>,
    /// Standard base64 payload.
    pub content: Option<String>,
}

/// Result class of an EWS response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseClass {
    Success,
    Warning,
    Error,
}

/// Per-item response from `DeleteItem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EwsResponseMessage {
    pub response_class: ResponseClass,
    /// `NoError` on success, otherwise an `Error*` code.
    pub response_code: String,
    #[serde(default)]
    pub message_text: Option<String>,
}

impl EwsResponseMessage {
    pub fn success() -> Self {
        Self {
            response_class: ResponseClass::Success,
            response_code: "NoError".to_string(),
            message_text: None,
        }
    }
}

/// Remote operations the EWS adapter needs.
#[async_trait]
pub trait EwsPort: Send + Sync {
    /// `FindItem` on a folder with offset paging.
    async fn find_items(
        &self,
        folder: &ProviderFolder,
        offset: usize,
        max_entries: usize,
        sort: ItemSort,
    ) -> Result<FindItemsPage>;

    /// `GetItem` with body, recipients and attachment metadata.
    async fn get_item(&self, item_id: &str) -> Result<EwsMessage>;

    /// `GetAttachment` for one file attachment.
    async fn get_attachment(&self, attachment_id: &str) -> Result<EwsFileAttachment>;

    /// `DeleteItem` for one item.
    async fn delete_item(&self, item_id: &str, mode: DeleteMode) -> Result<EwsResponseMessage>;
}

/// EWS implementation of [`MailAdapter`].
pub struct EwsAdapter<P> {
    port: P,
    limiter: RateLimiter,
    policy: AttachmentPolicy,
    resolver: FolderResolver,
}

impl<P: EwsPort> EwsAdapter<P> {
    pub fn new(port: P, options: AdapterOptions) -> Self {
        Self {
            port,
            limiter: RateLimiter::new(options.min_call_spacing),
            policy: AttachmentPolicy::new(options.attachment_ceiling),
            resolver: FolderResolver::new(EmailService::Owa),
        }
    }

    /// The port this adapter calls through.
    pub fn port(&self) -> &P {
        &self.port
    }

    async fn find(&self, folder: &ProviderFolder, request: &RetrievalRequest) -> Result<Vec<EwsItemSummary>> {
        let mut items = Vec::new();
        let mut offset = request.start_index;

        while items.len() < request.count {
            self.limiter.await_turn().await;
            let page = self
                .port
                .find_items(
                    folder,
                    offset,
                    request.count - items.len(),
                    ItemSort::DATE_TIME_SENT_ASC,
                )
                .await?;

            let returned = page.items.len();
            items.extend(page.items);
            if !page.more_available || returned == 0 {
                break;
            }
            offset = page.next_offset.unwrap_or(offset + returned);
        }

        items.truncate(request.count);
        Ok(items)
    }

    async fn collect(&self, folder: &ProviderFolder, request: &RetrievalRequest) -> Result<Vec<Email>> {
        let items = self.find(folder, request).await?;
        tracing::debug!(folder = %folder, found = items.len(), "Found EWS items");

        let mut emails = Vec::with_capacity(items.len());
        for item in items {
            if !item.is_message() {
                tracing::debug!(item_id = %item.item_id, class = ?item.item_class, "Skipping non-message item");
                continue;
            }

            self.limiter.await_turn().await;
            match self.port.get_item(&item.item_id).await {
                Ok(message) => emails.push(self.convert(message).await),
                Err(e) if e.is_authentication_failure() => return Err(e),
                Err(e) => {
                    tracing::warn!(item_id = %item.item_id, error = %e, "Skipping EWS item");
                }
            }
        }

        sort_chronologically(&mut emails);
        Ok(emails)
    }

    async fn convert(&self, message: EwsMessage) -> Email {
        let id = if message.item_id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            message.item_id.clone()
        };

        let sent_at = message
            .date_time_sent
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| message.date_time_received.as_deref().and_then(parse_timestamp))
            .unwrap_or_else(|| {
                tracing::debug!(item_id = %id, "No sent or received time; using current time");
                Utc::now()
            });

        let mut attachments = Vec::new();
        for attachment in message.attachments.iter().filter(|a| a.is_file) {
            attachments.push(self.attachment(attachment).await);
        }

        Email {
            id: id.into(),
            service: EmailService::Owa,
            from: message
                .from
                .and_then(|m| m.email_address)
                .unwrap_or_default(),
            to: mailbox_addresses(&message.to_recipients),
            cc: mailbox_addresses(&message.cc_recipients),
            bcc: mailbox_addresses(&message.bcc_recipients),
            sent_at,
            subject: message.subject.unwrap_or_default(),
            body: message.body.and_then(|b| b.text).unwrap_or_default(),
            attachments,
        }
    }

    async fn attachment(&self, attachment: &EwsAttachment) -> EmailAttachment {
        let name = attachment
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let content_type = file_extension(attachment.name.as_deref());
        let size = attachment.size.unwrap_or(0);

        let mut content = None;
        if self.policy.should_inline(size) {
            if let Some(attachment_id) = &attachment.attachment_id {
                self.limiter.await_turn().await;
                content = match self.port.get_attachment(attachment_id).await {
                    Ok(file) => file.content,
                    Err(e) => {
                        tracing::warn!(attachment = %name, error = %e, "Failed to fetch EWS attachment");
                        None
                    }
                };
            }
        }

        self.policy.materialize(name, content_type, size, content)
    }
}

fn mailbox_addresses(mailboxes: &[EwsMailbox]) -> Vec<String> {
    mailboxes
        .iter()
        .filter_map(|m| m.email_address.clone())
        .filter(|a| !a.trim().is_empty())
        .collect()
}

#[async_trait]
impl<P: EwsPort> MailAdapter for EwsAdapter<P> {
    fn service(&self) -> EmailService {
        EmailService::Owa
    }

    async fn fetch_batch(&self, request: &RetrievalRequest) -> RetrievalResult {
        let folder = request.effective_folder(EmailService::Owa);
        let resolved = match self.resolver.resolve(&folder) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!(folder = %folder, error = %e, "Cannot resolve EWS folder");
                return RetrievalResult::failure(
                    EmailService::Owa,
                    failure_diagnostic(EmailService::Owa, &e.into()),
                );
            }
        };

        tracing::info!(
            folder = %resolved,
            start = request.start_index,
            count = request.count,
            "Fetching EWS batch"
        );

        match self.collect(&resolved, request).await {
            Ok(emails) => {
                let result = RetrievalResult::batch(EmailService::Owa, emails, request.count);
                tracing::info!(count = result.count, status = %result.diagnostic, "EWS batch complete");
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "EWS batch failed");
                RetrievalResult::failure(EmailService::Owa, failure_diagnostic(EmailService::Owa, &e))
            }
        }
    }

    async fn delete_by_id(&self, email: &Email) -> DeleteOutcome {
        if let Some(rejected) = precheck_delete(EmailService::Owa, email) {
            tracing::warn!(item_id = %email.id, outcome = %rejected, "EWS delete rejected");
            return rejected;
        }

        self.limiter.await_turn().await;
        match self
            .port
            .delete_item(email.id.as_str(), DeleteMode::MoveToDeletedItems)
            .await
        {
            Ok(response) if response.response_class == ResponseClass::Success => {
                tracing::info!(item_id = %email.id, "Moved EWS item to Deleted Items");
                DeleteOutcome::Deleted
            }
            Ok(response) => {
                let reason = match response.message_text {
                    Some(text) => format!("{}: {}", response.response_code, text),
                    None => response.response_code,
                };
                tracing::warn!(item_id = %email.id, reason = %reason, "EWS delete refused");
                DeleteOutcome::Rejected(reason)
            }
            Err(e) => {
                tracing::warn!(item_id = %email.id, error = %e, "EWS delete failed");
                classify_delete_error(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmailFolder, FolderType, LAST_BATCH_MARKER};
    use crate::providers::email::folders::WellKnownFolder;
    use crate::providers::email::ProviderError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeEws {
        summaries: Vec<EwsItemSummary>,
        messages: HashMap<String, EwsMessage>,
        files: HashMap<String, String>,
        page_size: Option<usize>,
        delete_response: Option<EwsResponseMessage>,
        unauthorized_items: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeEws {
        fn with_messages(messages: Vec<EwsMessage>) -> Self {
            Self {
                summaries: messages
                    .iter()
                    .map(|m| EwsItemSummary {
                        item_id: m.item_id.clone(),
                        item_class: m.item_class.clone(),
                    })
                    .collect(),
                messages: messages.into_iter().map(|m| (m.item_id.clone(), m)).collect(),
                ..Default::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EwsPort for FakeEws {
        async fn find_items(
            &self,
            folder: &ProviderFolder,
            offset: usize,
            max_entries: usize,
            sort: ItemSort,
        ) -> Result<FindItemsPage> {
            assert_eq!(sort, ItemSort::DATE_TIME_SENT_ASC);
            self.record(format!(
                "find:{}:{}:{}",
                folder.native_id(EmailService::Owa),
                offset,
                max_entries
            ));
            let size = self.page_size.map_or(max_entries, |p| p.min(max_entries));
            let start = offset.min(self.summaries.len());
            let end = (start + size).min(self.summaries.len());
            Ok(FindItemsPage {
                items: self.summaries[start..end].to_vec(),
                more_available: end < self.summaries.len(),
                next_offset: Some(end),
            })
        }

        async fn get_item(&self, item_id: &str) -> Result<EwsMessage> {
            self.record(format!("get:{}", item_id));
            if self.unauthorized_items {
                return Err(ProviderError::Api {
                    status: 401,
                    message: "(401) Unauthorized".to_string(),
                });
            }
            self.messages
                .get(item_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(item_id.to_string()))
        }

        async fn get_attachment(&self, attachment_id: &str) -> Result<EwsFileAttachment> {
            self.record(format!("attachment:{}", attachment_id));
            Ok(EwsFileAttachment {
                attachment_id: attachment_id.to_string(),
                name: None,
                content: self.files.get(attachment_id).cloned(),
            })
        }

        async fn delete_item(&self, item_id: &str, mode: DeleteMode) -> Result<EwsResponseMessage> {
            self.record(format!("delete:{}:{:?}", item_id, mode));
            Ok(self
                .delete_response
                .clone()
                .unwrap_or_else(EwsResponseMessage::success))
        }
    }

    fn note(id: &str, sent: Option<&str>, received: Option<&str>) -> EwsMessage {
        EwsMessage {
            item_id: id.to_string(),
            item_class: Some("IPM.Note".to_string()),
            subject: Some(format!("Subject {}", id)),
            from: Some(EwsMailbox {
                name: Some("Sender".to_string()),
                email_address: Some("sender@corp.example".to_string()),
            }),
            to_recipients: vec![
                EwsMailbox {
                    name: None,
                    email_address: Some("one@corp.example".to_string()),
                },
                EwsMailbox {
                    name: Some("Blank".to_string()),
                    email_address: Some(" ".to_string()),
                },
            ],
            date_time_sent: sent.map(str::to_string),
            date_time_received: received.map(str::to_string),
            body: Some(EwsBody {
                body_type: Some("HTML".to_string()),
                text: Some(format!("<div>{}</div>", id)),
            }),
            ..Default::default()
        }
    }

    fn options() -> AdapterOptions {
        AdapterOptions {
            attachment_ceiling: 1_048_576,
            min_call_spacing: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn batch_is_sorted_even_when_server_is_not() {
        let fake = FakeEws::with_messages(vec![
            note("late", Some("2024-03-03T09:00:00Z"), None),
            note("early", Some("2024-03-01T09:00:00Z"), None),
            note("middle", None, Some("2024-03-02T09:00:00Z")),
        ]);
        let adapter = EwsAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 3)).await;
        assert!(result.success);
        let ids: Vec<&str> = result.emails.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);
        assert_eq!(result.emails[0].to, vec!["one@corp.example"]);
        assert_eq!(result.emails[0].from, "sender@corp.example");
        assert_eq!(result.emails[0].body, "<div>early</div>");
        assert_eq!(adapter.port.calls()[0], "find:inbox:0:3");
    }

    #[tokio::test]
    async fn non_message_items_are_skipped() {
        let mut meeting = note("meeting", Some("2024-03-01T09:00:00Z"), None);
        meeting.item_class = Some("IPM.Schedule.Meeting.Request".to_string());
        let mut signed = note("signed", Some("2024-03-01T10:00:00Z"), None);
        signed.item_class = Some("IPM.Note.SMIME".to_string());
        let fake = FakeEws::with_messages(vec![meeting, signed]);
        let adapter = EwsAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 2)).await;
        assert_eq!(result.count, 1);
        assert_eq!(result.emails[0].id.as_str(), "signed");
        assert_eq!(result.diagnostic, LAST_BATCH_MARKER);
        assert!(!adapter.port.calls().contains(&"get:meeting".to_string()));
    }

    #[tokio::test]
    async fn offset_paging_continues_while_more_available() {
        let messages: Vec<EwsMessage> = (1..=5)
            .map(|i| note(&format!("i{}", i), Some(&format!("2024-03-0{}T09:00:00Z", i)), None))
            .collect();
        let mut fake = FakeEws::with_messages(messages);
        fake.page_size = Some(2);
        let adapter = EwsAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(1, 3)).await;
        assert_eq!(result.count, 3);
        let finds: Vec<String> = adapter
            .port
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("find"))
            .collect();
        assert_eq!(finds, vec!["find:inbox:1:3", "find:inbox:3:1"]);
    }

    #[tokio::test]
    async fn unauthorized_detail_aborts_batch() {
        let mut fake = FakeEws::with_messages(vec![note("a", Some("2024-03-01T09:00:00Z"), None)]);
        fake.unauthorized_items = true;
        let adapter = EwsAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 1)).await;
        assert!(!result.success);
        assert_eq!(result.diagnostic, "Authentication failed. Please check OWA credentials.");
    }

    #[tokio::test]
    async fn file_attachments_only() {
        let mut msg = note("a", Some("2024-03-01T09:00:00Z"), None);
        msg.attachments = vec![
            EwsAttachment {
                attachment_id: Some("f1".to_string()),
                name: Some("budget.XLSX".to_string()),
                size: Some(100),
                is_file: true,
                ..Default::default()
            },
            EwsAttachment {
                attachment_id: Some("item1".to_string()),
                name: Some("Forwarded message".to_string()),
                size: Some(100),
                is_file: false,
                ..Default::default()
            },
            EwsAttachment {
                attachment_id: Some("f2".to_string()),
                name: None,
                size: Some(5_000_000),
                is_file: true,
                ..Default::default()
            },
        ];
        let mut fake = FakeEws::with_messages(vec![msg]);
        fake.files.insert("f1".to_string(), "UEsDBA==".to_string());
        let adapter = EwsAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 1)).await;
        let attachments = &result.emails[0].attachments;
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].content_type, "xlsx");
        assert_eq!(attachments[0].content.as_deref(), Some("UEsDBA=="));
        assert_eq!(attachments[1].name, "Unknown");
        assert_eq!(attachments[1].content_type, "unknown");
        assert!(attachments[1].content.is_none());
        assert!(!adapter.port.calls().contains(&"attachment:f2".to_string()));
    }

    #[tokio::test]
    async fn prefixed_handle_resolves_well_known_folder() {
        let adapter = EwsAdapter::new(FakeEws::default(), options());
        let folder = EmailFolder::standard(FolderType::Trash, EmailService::Owa).unwrap();

        adapter
            .fetch_batch(&RetrievalRequest::new(0, 5).with_folder(folder))
            .await;
        assert_eq!(adapter.port.calls(), vec!["find:deleteditems:0:5"]);
        assert_eq!(
            FolderResolver::new(EmailService::Owa)
                .resolve(&EmailFolder::custom("x", EmailService::Owa, "WellKnownFolderName.JunkEmail").unwrap())
                .unwrap(),
            ProviderFolder::WellKnown(WellKnownFolder::Junk)
        );
    }

    #[tokio::test]
    async fn delete_moves_to_deleted_items() {
        let adapter = EwsAdapter::new(FakeEws::default(), options());
        let outcome = adapter.delete_by_id(&Email::with_id(EmailService::Owa, "AAMkAD")).await;
        assert!(outcome.is_deleted());
        assert_eq!(adapter.port.calls(), vec!["delete:AAMkAD:MoveToDeletedItems"]);
    }

    #[tokio::test]
    async fn refused_delete_is_rejected_with_code() {
        let fake = FakeEws {
            delete_response: Some(EwsResponseMessage {
                response_class: ResponseClass::Error,
                response_code: "ErrorItemNotFound".to_string(),
                message_text: Some("The specified object was not found in the store.".to_string()),
            }),
            ..Default::default()
        };
        let adapter = EwsAdapter::new(fake, options());

        let outcome = adapter.delete_by_id(&Email::with_id(EmailService::Owa, "AAMkAD")).await;
        match outcome {
            DeleteOutcome::Rejected(reason) => assert!(reason.starts_with("ErrorItemNotFound")),
            other => panic!("expected rejection, got {}", other),
        }
    }

    #[tokio::test]
    async fn delete_for_other_service_makes_no_call() {
        let adapter = EwsAdapter::new(FakeEws::default(), options());
        let outcome = adapter.delete_by_id(&Email::with_id(EmailService::Gmail, "AAMkAD")).await;
        assert!(matches!(outcome, DeleteOutcome::Rejected(_)));
        assert!(adapter.port.calls().is_empty());
    }

    #[test]
    fn message_class_matching() {
        let summary = |class: Option<&str>| EwsItemSummary {
            item_id: "x".to_string(),
            item_class: class.map(str::to_string),
        };
        assert!(summary(Some("IPM.Note")).is_message());
        assert!(summary(Some("ipm.note.smime")).is_message());
        assert!(!summary(Some("IPM.Appointment")).is_message());
        assert!(!summary(None).is_message());
    }
}
