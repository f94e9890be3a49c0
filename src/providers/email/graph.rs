//! Microsoft Graph mail adapter.
//!
//! Graph sorts and pages natively, so the list call asks for
//! `sentDateTime asc` with `$skip`/`$top` directly. `$top` is capped at the
//! Graph page limit and `@odata.nextLink` covers the rest. Each listed message is
//! fetched again with its attachment metadata expanded, and file attachments
//! under the ceiling are fetched one at a time for their `contentBytes`.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use super::attachments::AttachmentPolicy;
use super::folders::FolderResolver;
use super::http::{build_client, refresh_access_token, RestClient};
use super::parser::parse_timestamp;
use super::rate_limit::RateLimiter;
use super::{
    classify_delete_error, failure_diagnostic, precheck_delete, AdapterOptions, DeleteOutcome,
    MailAdapter, Result,
};
use crate::config::{GraphCredentials, SecretSource};
use crate::domain::{
    file_extension, sort_chronologically, Email, EmailAttachment, EmailService, RetrievalRequest,
    RetrievalResult,
};

const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0/me";
const MICROSOFT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const GRAPH_SCOPES: &str = "offline_access Mail.Read Mail.ReadWrite";

/// Largest `$top` Graph accepts for a message listing.
const MAX_PAGE_SIZE: usize = 1000;

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";
const MESSAGE_FIELDS: &str =
    "id,subject,from,toRecipients,ccRecipients,bccRecipients,sentDateTime,receivedDateTime,body";

/// One page of a Graph collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphPage {
    #[serde(default)]
    pub value: Vec<GraphMessage>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Graph `message` resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphMessage {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<GraphRecipient>,
    pub to_recipients: Vec<GraphRecipient>,
    pub cc_recipients: Vec<GraphRecipient>,
    pub bcc_recipients: Vec<GraphRecipient>,
    pub sent_date_time: Option<String>,
    pub received_date_time: Option<String>,
    pub body: Option<GraphItemBody>,
    pub attachments: Vec<GraphAttachment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphRecipient {
    pub email_address: Option<GraphEmailAddress>,
}

impl GraphRecipient {
    fn address(&self) -> String {
        self.email_address
            .as_ref()
            .and_then(|e| e.address.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GraphEmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphItemBody {
    /// `html` or `text`.
    pub content_type: Option<String>,
    pub content: Option<String>,
}

/// Graph `attachment` resource (file, item or reference).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphAttachment {
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub is_inline: Option<bool>,
    /// Standard base64 payload; only present on file attachments.
    pub content_bytes: Option<String>,
}

impl GraphAttachment {
    fn is_file(&self) -> bool {
        self.odata_type
            .as_deref()
            .map_or(true, |t| t.eq_ignore_ascii_case(FILE_ATTACHMENT_TYPE))
    }
}

/// Remote operations the Graph adapter needs.
#[async_trait]
pub trait GraphPort: Send + Sync {
    /// Lists messages in a folder, oldest sent first.
    async fn list_messages(&self, folder: &str, skip: usize, top: usize) -> Result<GraphPage>;

    /// Follows a server-issued next-page link.
    async fn list_next(&self, next_link: &str) -> Result<GraphPage>;

    /// Fetches a message with attachment metadata expanded.
    async fn get_message(&self, id: &str) -> Result<GraphMessage>;

    /// Fetches one attachment including its content.
    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<GraphAttachment>;

    /// Deletes a message.
    async fn delete_message(&self, id: &str) -> Result<()>;
}

/// Authenticated Graph REST session.
#[derive(Debug, Clone)]
pub struct GraphSession {
    rest: RestClient,
}

impl GraphSession {
    pub async fn connect(credentials: &GraphCredentials, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout)?;
        let access_token = refresh_access_token(
            &client,
            MICROSOFT_TOKEN_URL,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("scope", GRAPH_SCOPES),
            ],
        )
        .await?;

        tracing::info!("Graph session authenticated");
        Ok(Self {
            rest: RestClient::new(client, GRAPH_API_BASE, access_token),
        })
    }
}

#[async_trait]
impl GraphPort for GraphSession {
    async fn list_messages(&self, folder: &str, skip: usize, top: usize) -> Result<GraphPage> {
        self.rest
            .get(
                &format!("/mailFolders/{}/messages", folder),
                &[
                    ("$orderby", "sentDateTime asc".to_string()),
                    ("$skip", skip.to_string()),
                    ("$top", top.to_string()),
                    ("$select", "id".to_string()),
                ],
            )
            .await
    }

    async fn list_next(&self, next_link: &str) -> Result<GraphPage> {
        self.rest.get_url(next_link).await
    }

    async fn get_message(&self, id: &str) -> Result<GraphMessage> {
        self.rest
            .get(
                &format!("/messages/{}", id),
                &[
                    ("$select", MESSAGE_FIELDS.to_string()),
                    (
                        "$expand",
                        "attachments($select=id,name,size,contentType,isInline)".to_string(),
                    ),
                ],
            )
            .await
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<GraphAttachment> {
        self.rest
            .get(
                &format!("/messages/{}/attachments/{}", message_id, attachment_id),
                &[],
            )
            .await
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        self.rest.delete(&format!("/messages/{}", id)).await
    }
}

/// Graph implementation of [`MailAdapter`].
pub struct GraphAdapter<P> {
    port: P,
    limiter: RateLimiter,
    policy: AttachmentPolicy,
    resolver: FolderResolver,
}

impl<P: GraphPort> GraphAdapter<P> {
    pub fn new(port: P, options: AdapterOptions) -> Self {
        Self {
            port,
            limiter: RateLimiter::new(options.min_call_spacing),
            policy: AttachmentPolicy::new(options.attachment_ceiling),
            resolver: FolderResolver::new(EmailService::Outlook),
        }
    }

    /// The port this adapter calls through.
    pub fn port(&self) -> &P {
        &self.port
    }

    async fn list(&self, folder: &str, request: &RetrievalRequest) -> Result<Vec<GraphMessage>> {
        self.limiter.await_turn().await;
        let mut page = self
            .port
            .list_messages(folder, request.start_index, request.count.min(MAX_PAGE_SIZE))
            .await?;
        let mut listed = std::mem::take(&mut page.value);

        while listed.len() < request.count {
            let Some(link) = page.next_link.take() else {
                break;
            };
            self.limiter.await_turn().await;
            page = self.port.list_next(&link).await?;
            listed.append(&mut page.value);
        }

        listed.truncate(request.count);
        Ok(listed)
    }

    async fn collect(&self, folder: &str, request: &RetrievalRequest) -> Result<Vec<Email>> {
        let listed = self.list(folder, request).await?;
        tracing::debug!(folder, listed = listed.len(), "Listed Graph messages");

        let mut emails = Vec::with_capacity(listed.len());
        for summary in listed {
            let id = summary.id.clone().filter(|id| !id.trim().is_empty());
            let Some(id) = id else {
                tracing::warn!(
                    subject = summary.subject.as_deref().unwrap_or_default(),
                    "Skipping Graph message without id"
                );
                continue;
            };

            self.limiter.await_turn().await;
            match self.port.get_message(&id).await {
                Ok(message) => emails.push(self.convert(message, id).await),
                Err(e) if e.is_authentication_failure() => return Err(e),
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "Skipping Graph message");
                }
            }
        }

        sort_chronologically(&mut emails);
        Ok(emails)
    }

    async fn convert(&self, message: GraphMessage, id: String) -> Email {
        let sent_at = message
            .sent_date_time
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(|| {
                tracing::debug!(message_id = %id, "No sent time; using current time");
                Utc::now()
            });

        let mut attachments = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            attachments.push(self.attachment(&id, attachment).await);
        }

        Email {
            service: EmailService::Outlook,
            from: message.from.as_ref().map(GraphRecipient::address).unwrap_or_default(),
            to: message.to_recipients.iter().map(GraphRecipient::address).collect(),
            cc: message.cc_recipients.iter().map(GraphRecipient::address).collect(),
            bcc: message.bcc_recipients.iter().map(GraphRecipient::address).collect(),
            sent_at,
            subject: message.subject.unwrap_or_default(),
            body: preferred_body(message.body.as_ref()),
            attachments,
            id: id.into(),
        }
    }

    async fn attachment(&self, message_id: &str, attachment: &GraphAttachment) -> EmailAttachment {
        let name = attachment
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let content_type = file_extension(attachment.name.as_deref());
        let size = attachment.size.unwrap_or(0);

        let mut content = None;
        if self.policy.should_inline(size) && attachment.is_file() {
            content = match (&attachment.content_bytes, &attachment.id) {
                (Some(bytes), _) => Some(bytes.clone()),
                (None, Some(attachment_id)) => {
                    self.limiter.await_turn().await;
                    match self.port.get_attachment(message_id, attachment_id).await {
                        Ok(full) => full.content_bytes,
                        Err(e) => {
                            tracing::warn!(attachment = %name, error = %e, "Failed to fetch Graph attachment");
                            None
                        }
                    }
                }
                (None, None) => None,
            };
        }

        tracing::debug!(attachment = %name, size, inlined = content.is_some(), "Mapped Graph attachment");
        self.policy.materialize(name, content_type, size, content)
    }
}

impl GraphAdapter<GraphSession> {
    pub async fn connect(
        secrets: &dyn SecretSource,
        options: AdapterOptions,
        timeout: Duration,
    ) -> Result<Self> {
        let credentials = GraphCredentials::from_secrets(secrets).await?;
        let session = GraphSession::connect(&credentials, timeout).await?;
        Ok(Self::new(session, options))
    }
}

/// Returns the body content.
///
/// Graph sends a single representation whose `contentType` is `html` or
/// `text`, so there is nothing to choose between.
fn preferred_body(body: Option<&GraphItemBody>) -> String {
    body.and_then(|b| b.content.clone()).unwrap_or_default()
}

#[async_trait]
impl<P: GraphPort> MailAdapter for GraphAdapter<P> {
    fn service(&self) -> EmailService {
        EmailService::Outlook
    }

    async fn fetch_batch(&self, request: &RetrievalRequest) -> RetrievalResult {
        let folder = request.effective_folder(EmailService::Outlook);
        let folder_id = match self.resolver.resolve(&folder) {
            Ok(resolved) => resolved.native_id(EmailService::Outlook).to_string(),
            Err(e) => {
                tracing::error!(folder = %folder, error = %e, "Cannot resolve Graph folder");
                return RetrievalResult::failure(
                    EmailService::Outlook,
                    failure_diagnostic(EmailService::Outlook, &e.into()),
                );
            }
        };

        tracing::info!(
            folder = %folder_id,
            start = request.start_index,
            count = request.count,
            "Fetching Graph batch"
        );

        match self.collect(&folder_id, request).await {
            Ok(emails) => {
                let result = RetrievalResult::batch(EmailService::Outlook, emails, request.count);
                tracing::info!(count = result.count, status = %result.diagnostic, "Graph batch complete");
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "Graph batch failed");
                RetrievalResult::failure(
                    EmailService::Outlook,
                    failure_diagnostic(EmailService::Outlook, &e),
                )
            }
        }
    }

    async fn delete_by_id(&self, email: &Email) -> DeleteOutcome {
        if let Some(rejected) = precheck_delete(EmailService::Outlook, email) {
            tracing::warn!(message_id = %email.id, outcome = %rejected, "Graph delete rejected");
            return rejected;
        }

        self.limiter.await_turn().await;
        match self.port.delete_message(email.id.as_str()).await {
            Ok(()) => {
                tracing::info!(message_id = %email.id, "Deleted Graph message");
                DeleteOutcome::Deleted
            }
            Err(e) => {
                tracing::warn!(message_id = %email.id, error = %e, "Graph delete failed");
                classify_delete_error(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmailFolder, FolderType, LAST_BATCH_MARKER};
    use crate::providers::email::ProviderError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGraph {
        /// Messages in sent-time order, as the server would return them.
        messages: Vec<GraphMessage>,
        attachments: HashMap<String, GraphAttachment>,
        page_size: Option<usize>,
        fail_detail: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGraph {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn page(&self, offset: usize, top: usize) -> GraphPage {
            let size = self.page_size.map_or(top, |p| p.min(top));
            let end = (offset + size).min(self.messages.len());
            let value = self.messages[offset.min(end)..end]
                .iter()
                .map(|m| GraphMessage {
                    id: m.id.clone(),
                    ..Default::default()
                })
                .collect();
            let next_link =
                (end < self.messages.len()).then(|| format!("next:{}:{}", end, top));
            GraphPage { value, next_link }
        }
    }

    #[async_trait]
    impl GraphPort for FakeGraph {
        async fn list_messages(&self, folder: &str, skip: usize, top: usize) -> Result<GraphPage> {
            self.record(format!("list:{}:{}:{}", folder, skip, top));
            Ok(self.page(skip, top))
        }

        async fn list_next(&self, next_link: &str) -> Result<GraphPage> {
            self.record(next_link.to_string());
            let mut parts = next_link.split(':').skip(1);
            let offset = parts.next().unwrap().parse().unwrap();
            let top = parts.next().unwrap().parse().unwrap();
            Ok(self.page(offset, top))
        }

        async fn get_message(&self, id: &str) -> Result<GraphMessage> {
            self.record(format!("get:{}", id));
            if self.fail_detail.as_deref() == Some(id) {
                return Err(ProviderError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            self.messages
                .iter()
                .find(|m| m.id.as_deref() == Some(id))
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(id.to_string()))
        }

        async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<GraphAttachment> {
            self.record(format!("attachment:{}:{}", message_id, attachment_id));
            self.attachments
                .get(attachment_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(attachment_id.to_string()))
        }

        async fn delete_message(&self, id: &str) -> Result<()> {
            self.record(format!("delete:{}", id));
            Err(ProviderError::Authentication("unauthorized".to_string()))
        }
    }

    fn recipient(address: &str) -> GraphRecipient {
        GraphRecipient {
            email_address: Some(GraphEmailAddress {
                name: None,
                address: Some(address.to_string()),
            }),
        }
    }

    fn message(id: &str, sent: &str) -> GraphMessage {
        GraphMessage {
            id: Some(id.to_string()),
            subject: Some(format!("Subject {}", id)),
            from: Some(recipient("sender@contoso.com")),
            to_recipients: vec![recipient("a@contoso.com"), recipient("b@contoso.com")],
            sent_date_time: Some(sent.to_string()),
            body: Some(GraphItemBody {
                content_type: Some("html".to_string()),
                content: Some(format!("<p>{}</p>", id)),
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
    async fn batch_uses_native_paging() {
        let fake = FakeGraph {
            messages: vec![
                message("m1", "2024-01-01T08:00:00Z"),
                message("m2", "2024-01-02T08:00:00Z"),
                message("m3", "2024-01-03T08:00:00Z"),
            ],
            ..Default::default()
        };
        let adapter = GraphAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(1, 2)).await;
        assert!(result.success);
        assert_eq!(result.diagnostic, "");
        let ids: Vec<&str> = result.emails.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
        assert_eq!(result.emails[0].to, vec!["a@contoso.com", "b@contoso.com"]);
        assert_eq!(result.emails[0].body, "<p>m2</p>");
        assert_eq!(adapter.port.calls()[0], "list:inbox:1:2");
    }

    #[tokio::test]
    async fn next_links_are_followed() {
        let fake = FakeGraph {
            messages: (1..=5)
                .map(|i| message(&format!("m{}", i), &format!("2024-01-0{}T08:00:00Z", i)))
                .collect(),
            page_size: Some(2),
            ..Default::default()
        };
        let adapter = GraphAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 5)).await;
        assert_eq!(result.count, 5);
        let lists: Vec<String> = adapter
            .port
            .calls()
            .into_iter()
            .filter(|c| !c.starts_with("get"))
            .collect();
        assert_eq!(lists, vec!["list:inbox:0:5", "next:2:5", "next:4:5"]);
    }

    #[tokio::test]
    async fn large_batch_caps_top_and_follows_next_link() {
        let fake = FakeGraph {
            messages: (0..1200)
                .map(|i| message(&format!("m{:04}", i), "2024-01-01T08:00:00Z"))
                .collect(),
            ..Default::default()
        };
        let adapter = GraphAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 1500)).await;
        assert!(result.success);
        assert_eq!(result.count, 1200);
        assert!(result.is_last_batch());
        assert_eq!(result.emails[0].id.as_str(), "m0000");
        assert_eq!(result.emails[1199].id.as_str(), "m1199");
        let lists: Vec<String> = adapter
            .port
            .calls()
            .into_iter()
            .filter(|c| !c.starts_with("get"))
            .collect();
        assert_eq!(lists, vec!["list:inbox:0:1000", "next:1000:1000"]);
    }

    #[tokio::test]
    async fn detail_failure_skips_message() {
        let fake = FakeGraph {
            messages: vec![
                message("m1", "2024-01-01T08:00:00Z"),
                message("m2", "2024-01-02T08:00:00Z"),
            ],
            fail_detail: Some("m1".to_string()),
            ..Default::default()
        };
        let adapter = GraphAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 2)).await;
        assert!(result.success);
        assert_eq!(result.count, 1);
        assert_eq!(result.diagnostic, LAST_BATCH_MARKER);
    }

    #[tokio::test]
    async fn attachments_respect_ceiling() {
        let mut msg = message("m1", "2024-01-01T08:00:00Z");
        msg.attachments = vec![
            GraphAttachment {
                odata_type: Some(FILE_ATTACHMENT_TYPE.to_string()),
                id: Some("small".to_string()),
                name: Some("Notes.TXT".to_string()),
                size: Some(12),
                ..Default::default()
            },
            GraphAttachment {
                odata_type: Some(FILE_ATTACHMENT_TYPE.to_string()),
                id: Some("big".to_string()),
                name: Some("scan.pdf".to_string()),
                size: Some(2_000_000),
                ..Default::default()
            },
            GraphAttachment {
                odata_type: Some("#microsoft.graph.itemAttachment".to_string()),
                id: Some("item".to_string()),
                name: None,
                size: Some(10),
                ..Default::default()
            },
        ];
        let mut attachments = HashMap::new();
        attachments.insert(
            "small".to_string(),
            GraphAttachment {
                content_bytes: Some("aGVsbG8gd29ybGQh".to_string()),
                ..Default::default()
            },
        );
        let fake = FakeGraph {
            messages: vec![msg],
            attachments,
            ..Default::default()
        };
        let adapter = GraphAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 1)).await;
        let mapped = &result.emails[0].attachments;
        assert_eq!(mapped.len(), 3);

        assert_eq!(mapped[0].content_type, "txt");
        assert_eq!(mapped[0].content.as_deref(), Some("aGVsbG8gd29ybGQh"));

        assert_eq!(mapped[1].content_type, "pdf");
        assert_eq!(mapped[1].size_bytes, 2_000_000);
        assert!(mapped[1].content.is_none());

        assert_eq!(mapped[2].name, "Unknown");
        assert_eq!(mapped[2].content_type, "unknown");
        assert!(mapped[2].content.is_none());

        let attachment_calls: Vec<String> = adapter
            .port
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("attachment"))
            .collect();
        assert_eq!(attachment_calls, vec!["attachment:m1:small"]);
    }

    #[tokio::test]
    async fn summary_without_id_is_skipped() {
        let mut anonymous = message("ignored", "2024-01-01T08:00:00Z");
        anonymous.id = None;
        let fake = FakeGraph {
            messages: vec![anonymous, message("m2", "2024-01-02T08:00:00Z")],
            ..Default::default()
        };
        let adapter = GraphAdapter::new(fake, options());

        let result = adapter.fetch_batch(&RetrievalRequest::new(0, 2)).await;
        assert!(result.success);
        assert_eq!(result.count, 1);
        assert_eq!(result.emails[0].id.as_str(), "m2");
        assert!(result.emails.iter().all(|e| !e.id.as_str().is_empty()));
        assert_eq!(result.diagnostic, LAST_BATCH_MARKER);
        assert_eq!(adapter.port.calls(), vec!["list:inbox:0:2", "get:m2"]);
    }

    #[tokio::test]
    async fn spam_folder_maps_to_junk() {
        let adapter = GraphAdapter::new(FakeGraph::default(), options());
        let folder = EmailFolder::standard(FolderType::Spam, EmailService::Outlook).unwrap();

        let result = adapter
            .fetch_batch(&RetrievalRequest::new(0, 10).with_folder(folder))
            .await;
        assert!(result.success);
        assert_eq!(adapter.port.calls(), vec!["list:junkemail:0:10"]);
    }

    #[tokio::test]
    async fn delete_auth_error_is_failed() {
        let adapter = GraphAdapter::new(FakeGraph::default(), options());
        let outcome = adapter
            .delete_by_id(&Email::with_id(EmailService::Outlook, "AAMk1"))
            .await;
        assert!(matches!(
            outcome,
            DeleteOutcome::Failed(ProviderError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn delete_with_empty_id_makes_no_call() {
        let adapter = GraphAdapter::new(FakeGraph::default(), options());
        let outcome = adapter
            .delete_by_id(&Email::with_id(EmailService::Outlook, " "))
            .await;
        assert!(matches!(outcome, DeleteOutcome::Rejected(_)));
        assert!(adapter.port.calls().is_empty());
    }

    #[test]
    fn body_selection() {
        let html = GraphItemBody {
            content_type: Some("HTML".to_string()),
            content: Some("<b>hi</b>".to_string()),
        };
        assert_eq!(preferred_body(Some(&html)), "<b>hi</b>");

        let text = GraphItemBody {
            content_type: Some("text".to_string()),
            content: Some("hi".to_string()),
        };
        assert_eq!(preferred_body(Some(&text)), "hi");
        assert_eq!(preferred_body(None), "");
    }

    #[test]
    fn graph_page_deserializes_next_link() {
        let json = r#"{"value":[{"id":"a"}],"@odata.nextLink":"https://graph.microsoft.com/v1.0/me/messages?$skip=10"}"#;
        let page: GraphPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.is_some());
    }

    #[test]
    fn attachment_type_detection() {
        let json = r##"{"@odata.type":"#microsoft.graph.referenceAttachment","name":"link"}"##;
        let attachment: GraphAttachment = serde_json::from_str(json).unwrap();
        assert!(!attachment.is_file());
        assert!(GraphAttachment::default().is_file());
    }
}
