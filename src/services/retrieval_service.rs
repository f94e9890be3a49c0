//! Retrieval service.
//!
//! The [`RetrievalService`] routes batch and delete calls to the adapter
//! registered for a service and turns every way a call can go wrong into a
//! failed [`RetrievalResult`] instead of an error.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::domain::{Email, EmailService, RetrievalRequest, RetrievalResult};
use crate::providers::email::{DeleteOutcome, MailAdapter};

/// Drives registered adapters through single batch requests.
///
/// # Example
///
/// ```ignore
/// let service = RetrievalService::new().with_deadline(Duration::from_secs(120));
/// service.register_adapter(Arc::new(gmail_adapter)).await;
///
/// let result = service
///     .fetch_batch(EmailService::Gmail, &RetrievalRequest::new(0, 50))
///     .await;
/// ```
pub struct RetrievalService {
    /// Registered adapters by service.
    adapters: RwLock<HashMap<EmailService, Arc<dyn MailAdapter>>>,
    /// Upper bound on one batch call.
    deadline: Option<Duration>,
}

impl Default for RetrievalService {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrievalService {
    /// Creates a service with no adapters and no deadline.
    pub fn new() -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
            deadline: None,
        }
    }

    /// Bounds every batch call by `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Registers an adapter under the service it reports, replacing any
    /// previous one.
    pub async fn register_adapter(&self, adapter: Arc<dyn MailAdapter>) {
        let service = adapter.service();
        let mut adapters = self.adapters.write().await;
        if adapters.insert(service, adapter).is_some() {
            tracing::debug!(service = %service, "Replaced registered adapter");
        }
    }

    /// Unregisters the adapter for a service.
    pub async fn unregister_adapter(&self, service: EmailService) {
        let mut adapters = self.adapters.write().await;
        adapters.remove(&service);
    }

    /// Services that currently have an adapter.
    pub async fn services(&self) -> Vec<EmailService> {
        let adapters = self.adapters.read().await;
        let mut services: Vec<EmailService> = adapters.keys().copied().collect();
        services.sort_by_key(|s| s.as_str());
        services
    }

    async fn adapter(&self, service: EmailService) -> Option<Arc<dyn MailAdapter>> {
        self.adapters.read().await.get(&service).cloned()
    }

    /// Retrieves one batch from `service`.
    pub async fn fetch_batch(
        &self,
        service: EmailService,
        request: &RetrievalRequest,
    ) -> RetrievalResult {
        self.fetch_batch_with_cancel(service, request, CancellationToken::new())
            .await
    }

    /// Retrieves one batch, aborting when `cancel` fires.
    ///
    /// An invalid request, a missing adapter, the deadline passing, the
    /// token firing and a panicking adapter all yield `success = false`.
    pub async fn fetch_batch_with_cancel(
        &self,
        service: EmailService,
        request: &RetrievalRequest,
        cancel: CancellationToken,
    ) -> RetrievalResult {
        if let Err(e) = request.validate() {
            tracing::warn!(service = %service, error = %e, "Rejected retrieval request");
            return RetrievalResult::failure(service, e.to_string());
        }

        let Some(adapter) = self.adapter(service).await else {
            tracing::error!(service = %service, "No adapter registered");
            return RetrievalResult::failure(
                service,
                format!("No adapter registered for {}", service),
            );
        };

        let call = AssertUnwindSafe(adapter.fetch_batch(request)).catch_unwind();
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout(deadline, call).await.ok(),
                None => Some(call.await),
            }
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(service = %service, "Retrieval cancelled");
                RetrievalResult::failure(service, "Retrieval cancelled")
            }
            outcome = bounded => match outcome {
                Some(Ok(result)) => result,
                Some(Err(panic)) => {
                    let reason = panic_reason(panic.as_ref());
                    tracing::error!(service = %service, reason = %reason, "Adapter panicked");
                    RetrievalResult::failure(
                        service,
                        format!("Failed to retrieve emails: adapter panicked: {}", reason),
                    )
                }
                None => {
                    tracing::error!(service = %service, deadline = ?self.deadline, "Retrieval timed out");
                    RetrievalResult::failure(service, "Failed to retrieve emails: timed out")
                }
            },
        };

        result.enforce_invariants()
    }

    /// Deletes `email` through the adapter for its service.
    pub async fn delete_by_id(&self, email: &Email) -> DeleteOutcome {
        match self.adapter(email.service).await {
            Some(adapter) => adapter.delete_by_id(email).await,
            None => {
                tracing::warn!(service = %email.service, email_id = %email.id, "No adapter for delete");
                DeleteOutcome::Rejected(format!("No adapter registered for {}", email.service))
            }
        }
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
