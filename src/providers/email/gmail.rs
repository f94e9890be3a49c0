//! Gmail REST adapter.
//!
//! This module provides a [`MailAdapter`] implementation over the Gmail REST
//! API. The list endpoint pages by opaque token and returns ids newest first,
//! so the adapter lists the whole label, reverses it, slices out the requested
//! window from the oldest end, fetches each message in full and sorts the
//! batch by sent time itself.
//!
//! # API Usage
//!
//! - `users.messages.list` for message ids in a label
//! - `users.messages.get` (`format=full`) for the part tree
//! - `users.messages.attachments.get` for detached attachment payloads
//! - `users.messages.delete` for permanent deletion

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::attachments::AttachmentPolicy;
use super::folders::FolderResolver;
use super::http::{build_client, refresh_access_token, RestClient};
use super::parser::{parse_date_header, AttachmentSource, MessageParser, MimePart};
use super::rate_limit::RateLimiter;
use super::{
    classify_delete_error, failure_diagnostic, precheck_delete, AdapterOptions, DeleteOutcome,
    MailAdapter, ProviderError, Result,
};
use crate::config::{GmailCredentials, SecretSource};
use crate::domain::{
    sort_chronologically, Email, EmailService, RetrievalRequest, RetrievalResult,
};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Largest page the list endpoint accepts.
pub const MAX_PAGE_SIZE: usize = 500;

/// One page of `users.messages.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListPage {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
}

/// Message reference returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Gmail API message in `full` format.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    /// Milliseconds since the epoch, as a decimal string.
    pub internal_date: Option<String>,
    pub payload: Option<MimePart>,
}

/// Gmail attachment resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailAttachmentBody {
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Remote operations the Gmail adapter needs.
#[async_trait]
pub trait GmailPort: Send + Sync {
    /// Lists message ids carrying `label`, newest first.
    async fn list_message_ids(
        &self,
        label: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<MessageListPage>;

    /// Fetches one message with its full part tree.
    async fn get_message(&self, id: &str) -> Result<GmailMessage>;

    /// Fetches a detached attachment payload.
    async fn get_attachment(&self, message_id: &str, attachment_id: &str)
        -> Result<GmailAttachmentBody>;

    /// Permanently deletes a message.
    async fn delete_message(&self, id: &str) -> Result<()>;
}

/// Authenticated Gmail REST session.
#[derive(Debug, Clone)]
pub struct GmailSession {
    rest: RestClient,
}

impl GmailSession {
    /// Exchanges the refresh token and binds the session to the mailbox.
    pub async fn connect(credentials: &GmailCredentials, timeout: Duration) -> Result<Self> {
        let client = build_client(timeout)?;
        let access_token = refresh_access_token(
            &client,
            GOOGLE_TOKEN_URL,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
            ],
        )
        .await?;

        let base_url = format!("{}/{}", GMAIL_API_BASE, credentials.mailbox);
        tracing::info!(mailbox = %credentials.mailbox, "Gmail session authenticated");
        Ok(Self {
            rest: RestClient::new(client, base_url, access_token),
        })
    }
}

#[async_trait]
impl GmailPort for GmailSession {
    async fn list_message_ids(
        &self,
        label: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<MessageListPage> {
        let mut query = vec![
            ("labelIds", label.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.rest.get("/messages", &query).await
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        self.rest
            .get(&format!("/messages/{}", id), &[("format", "full".to_string())])
            .await
    }

    async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<GmailAttachmentBody> {
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

/// Gmail implementation of [`MailAdapter`].
pub struct GmailAdapter<P> {
    port: P,
    limiter: RateLimiter,
    parser: MessageParser,
    resolver: FolderResolver,
}

impl<P: GmailPort> GmailAdapter<P> {
    pub fn new(port: P, options: AdapterOptions) -> Self {
        Self {
            port,
            limiter: RateLimiter::new(options.min_call_spacing),
            parser: MessageParser::new(AttachmentPolicy::new(options.attachment_ceiling)),
            resolver: FolderResolver::new(EmailService::Gmail),
        }
    }

    /// The port this adapter calls through.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Lists every id carrying `label`, following page tokens, oldest first.
    ///
    /// The list endpoint returns ids newest first, so the window can only be
    /// taken from the oldest end once the label is exhausted.
    async fn list_ids_oldest_first(&self, label: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            self.limiter.await_turn().await;
            let page = self
                .port
                .list_message_ids(label, MAX_PAGE_SIZE, page_token.as_deref())
                .await?;

            ids.extend(page.messages.into_iter().map(|m| m.id));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        ids.reverse();
        Ok(ids)
    }

    async fn collect(&self, request: &RetrievalRequest, label: &str) -> Result<Vec<Email>> {
        let ids = self.list_ids_oldest_first(label).await?;
        tracing::debug!(label, listed = ids.len(), "Listed Gmail message ids");

        let mut emails = Vec::with_capacity(request.count.min(MAX_PAGE_SIZE));
        for id in ids.into_iter().skip(request.start_index).take(request.count) {
            self.limiter.await_turn().await;
            let message = match self.port.get_message(&id).await {
                Ok(message) => message,
                Err(e) if e.is_authentication_failure() => return Err(e),
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "Skipping Gmail message");
                    continue;
                }
            };

            match self.convert(message).await {
                Ok(email) => emails.push(email),
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "Failed to convert Gmail message");
                }
            }
        }

        sort_chronologically(&mut emails);
        Ok(emails)
    }

    async fn convert(&self, message: GmailMessage) -> Result<Email> {
        if message.id.trim().is_empty() {
            return Err(ProviderError::Conversion("message has no id".to_string()));
        }
        let payload = message.payload.unwrap_or_default();
        let source = GmailAttachments {
            port: &self.port,
            limiter: &self.limiter,
            message_id: &message.id,
        };
        let parsed = self.parser.parse(&payload, &source).await;

        let sent_at = parsed
            .headers
            .date
            .as_deref()
            .and_then(parse_date_header)
            .or_else(|| parse_internal_date(message.internal_date.as_deref()))
            .unwrap_or_else(|| {
                tracing::debug!(message_id = %message.id, "No usable date; using current time");
                Utc::now()
            });

        let body = parsed.body();
        Ok(Email {
            id: message.id.into(),
            service: EmailService::Gmail,
            from: parsed.headers.from,
            to: parsed.headers.to,
            cc: parsed.headers.cc,
            bcc: parsed.headers.bcc,
            sent_at,
            subject: parsed.headers.subject,
            body,
            attachments: parsed.attachments,
        })
    }
}

impl GmailAdapter<GmailSession> {
    /// Builds an adapter over a live session. Fails when a secret is missing
    /// or the token exchange is refused.
    pub async fn connect(
        secrets: &dyn SecretSource,
        options: AdapterOptions,
        timeout: Duration,
    ) -> Result<Self> {
        let credentials = GmailCredentials::from_secrets(secrets).await?;
        let session = GmailSession::connect(&credentials, timeout).await?;
        Ok(Self::new(session, options))
    }
}

fn parse_internal_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let millis = value?.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Paced attachment fetches for one message.
struct GmailAttachments<'a, P> {
    port: &'a P,
    limiter: &'a RateLimiter,
    message_id: &'a str,
}

#[async_trait]
impl<'a, P: GmailPort> AttachmentSource for GmailAttachments<'a, P> {
    async fn fetch_attachment(&self, attachment_id: &str) -> Result<String> {
        self.limiter.await_turn().await;
        let body = self
            .port
            .get_attachment(self.message_id, attachment_id)
            .await?;
        body.data.ok_or_else(|| {
            ProviderError::MalformedResponse(format!("attachment {} has no data", attachment_id))
        })
    }
}

#[async_trait]
impl<P: GmailPort> MailAdapter for GmailAdapter<P> {
    fn service(&self) -> EmailService {
        EmailService::Gmail
    }

    async fn fetch_batch(&self, request: &RetrievalRequest) -> RetrievalResult {
        let folder = request.effective_folder(EmailService::Gmail);
        let label = match self.resolver.resolve(&folder) {
            Ok(resolved) => resolved.native_id(EmailService::Gmail).to_string(),
            Err(e) => {
                tracing::error!(folder = %folder, error = %e, "Cannot resolve Gmail folder");
                return RetrievalResult::failure(
                    EmailService::Gmail,
                    failure_diagnostic(EmailService::Gmail, &e.into()),
                );
            }
        };

        tracing::info!(
            label = %label,
            start = request.start_index,
            count = request.count,
            "Fetching Gmail batch"
        );

        match self.collect(request, &label).await {
            Ok(emails) => {
                let result = RetrievalResult::batch(EmailService::Gmail, emails, request.count);
                tracing::info!(count = result.count, status = %result.diagnostic, "Gmail batch complete");
                result
            }
            Err(e) => {
                tracing::error!(error = %e, "Gmail batch failed");
                RetrievalResult::failure(EmailService::Gmail, failure_diagnostic(EmailService::Gmail, &e))
            }
        }
    }

    async fn delete_by_id(&self, email: &Email) -> DeleteOutcome {
        if let Some(rejected) = precheck_delete(EmailService::Gmail, email) {
            tracing::warn!(message_id = %email.id, outcome = %rejected, "Gmail delete rejected");
            return rejected;
        }

        self.limiter.await_turn().await;
        match self.port.delete_message(email.id.as_str()).await {
            Ok(()) => {
                tracing::info!(message_id = %email.id, "Deleted Gmail message");
                DeleteOutcome::Deleted
            }
            Err(e) => {
                tracing::warn!(message_id = %email.id, error = %e, "Gmail delete failed");
                classify_delete_error(e)
            }
        }
    }
}
