// Outbound notification hook.
//
// Notifications are best-effort: callers log failures and move on. A failed
// notification never rolls back or retries the write that triggered it.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    /// A submission was accepted into the pending queue.
    Received,
    /// Processing stored a mention for a slot that was empty.
    Added,
    /// Processing replaced a stored mention whose content changed.
    Updated,
}

impl NotifyEvent {
    pub fn label(&self) -> &'static str {
        match self {
            NotifyEvent::Received => "received",
            NotifyEvent::Added => "added",
            NotifyEvent::Updated => "updated",
        }
    }

    /// Human-readable message, e.g. `https://mysite/a received a webmention from https://b/`.
    pub fn message(&self, source: &str, target: &str) -> String {
        match self {
            NotifyEvent::Received => format!("{target} received a webmention from {source}"),
            NotifyEvent::Added => format!("{target} processed a new webmention from {source}"),
            NotifyEvent::Updated => {
                format!("{target} processed an updated webmention from {source}")
            }
        }
    }
}

impl std::fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, source: &str, target: &str, event: NotifyEvent) -> Result<()>;
}

// ---------------------------------------------------------------------------
// WebhookNotifier (production)
// ---------------------------------------------------------------------------

/// POSTs a plain-text message to a webhook. The `Click` header carries the
/// source URL (ntfy click action).
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, source: &str, target: &str, event: NotifyEvent) -> Result<()> {
        let resp = self
            .http
            .post(&self.url)
            .header("Click", source)
            .body(event.message(source, target))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Webhook notification failed ({}): {}", status, error_text);
        }

        tracing::debug!(source, page = target, event = %event, "Webhook notified");
        Ok(())
    }
}

/// Used when no webhook is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _source: &str, _target: &str, _event: NotifyEvent) -> Result<()> {
        Ok(())
    }
}
