use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use url::Url;

use webmention_common::{
    authorize, translate, Mention, MentionType, Result, SupportedHosts, WebmentionError,
};
use webmention_io_client::WebmentionIoClient;
use webmention_store::{page_key, MemoryStore, MentionStore};

use crate::notify::{NoopNotifier, Notifier, NotifyEvent};
use crate::processor::{CycleSummary, MentionProcessor};
use crate::queue::{Disposition, PendingQueue};
use crate::verifier::Verifier;

/// Source of already-verified mentions from a third-party aggregator.
#[async_trait]
pub trait MentionFeed: Send + Sync {
    /// Raw jf2 entries. Translation happens in the receiver so that one bad
    /// entry is skipped rather than failing the whole import.
    async fn fetch(&self, token: &str) -> Result<Vec<serde_json::Value>>;
}

#[async_trait]
impl MentionFeed for WebmentionIoClient {
    async fn fetch(&self, token: &str) -> Result<Vec<serde_json::Value>> {
        self.fetch_mentions(token)
            .await
            .map_err(|e| WebmentionError::Upstream(e.to_string()))
    }
}

/// Everything the receiver needs. The store falls back to an in-memory
/// store and the notifier to a no-op when not given.
#[derive(Clone, TypedBuilder)]
pub struct ReceiverDeps {
    pub supported_hosts: SupportedHosts,
    pub verifier: Arc<dyn Verifier>,
    #[builder(default)]
    pub store: Option<Arc<dyn MentionStore>>,
    #[builder(default = Arc::new(NoopNotifier) as Arc<dyn Notifier>)]
    pub notifier: Arc<dyn Notifier>,
    /// Shared secret for the administrative operations.
    #[builder(default)]
    pub token: Option<String>,
    #[builder(default)]
    pub feed: Option<Arc<dyn MentionFeed>>,
    #[builder(default = Duration::from_secs(10))]
    pub verify_timeout: Duration,
    #[builder(default = 8)]
    pub concurrency: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Entries returned by the aggregator.
    pub fetched: usize,
    pub imported: usize,
    /// Entries that failed translation, targeted an unsupported host, or
    /// failed to store.
    pub skipped: usize,
    pub targets: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} webmentions for {} targets",
            self.imported, self.targets
        )
    }
}

/// The receiver's public operations: submission, lookup, processing and
/// the token-guarded administrative calls.
pub struct WebmentionReceiver {
    store: Arc<dyn MentionStore>,
    queue: PendingQueue,
    processor: MentionProcessor,
    notifier: Arc<dyn Notifier>,
    supported_hosts: SupportedHosts,
    token: Option<String>,
    feed: Option<Arc<dyn MentionFeed>>,
}

impl WebmentionReceiver {
    pub fn new(deps: ReceiverDeps) -> Self {
        let store = deps
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn MentionStore>);
        let queue = PendingQueue::new(
            store.clone(),
            deps.verifier.clone(),
            deps.supported_hosts.clone(),
        );
        let processor = MentionProcessor::new(
            store.clone(),
            deps.verifier,
            deps.notifier.clone(),
            deps.verify_timeout,
            deps.concurrency,
        );
        Self {
            store,
            queue,
            processor,
            notifier: deps.notifier,
            supported_hosts: deps.supported_hosts,
            token: deps.token,
            feed: deps.feed,
        }
    }

    pub fn store(&self) -> &Arc<dyn MentionStore> {
        &self.store
    }

    /// Queue a submission and fire a `received` notification without
    /// waiting on it.
    pub async fn submit(&self, source: Option<&str>, target: Option<&str>) -> Result<Disposition> {
        let disposition = self.queue.enqueue(source, target).await?;

        let notifier = self.notifier.clone();
        let source = source.unwrap_or_default().trim().to_string();
        let target = target.unwrap_or_default().trim().to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&source, &target, NotifyEvent::Received).await {
                warn!(source = %source, page = %target, error = %e, "Notification failed");
            }
        });

        Ok(disposition)
    }

    /// Run one processing cycle over the pending queue.
    pub async fn process(&self) -> Result<CycleSummary> {
        self.processor.run_cycle().await
    }

    /// Mentions stored for one page. An unknown `type` value is rejected.
    pub async fn mentions_for_page(
        &self,
        url: &str,
        mention_type: Option<&str>,
    ) -> Result<Vec<Mention>> {
        let mention_type = match mention_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => Some(MentionType::from_str_loose(raw).ok_or_else(|| {
                WebmentionError::validation(format!("Invalid \"type\": {raw}"))
            })?),
            None => None,
        };
        self.store.get_mentions_for_page(url, mention_type).await
    }

    pub async fn all_mentions(&self, token: Option<&str>) -> Result<BTreeMap<String, Vec<Mention>>> {
        self.authorize(token)?;
        self.store.get_all_mentions().await
    }

    /// Lookup as exposed over HTTP: a page's mentions keyed by the requested
    /// URL, or the full dump when only a token is given.
    pub async fn lookup(
        &self,
        url: Option<&str>,
        mention_type: Option<&str>,
        token: Option<&str>,
    ) -> Result<BTreeMap<String, Vec<Mention>>> {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => {
                let mentions = self.mentions_for_page(url, mention_type).await?;
                Ok(BTreeMap::from([(url.to_string(), mentions)]))
            }
            None if token.is_some() => self.all_mentions(token).await,
            None => Err(WebmentionError::validation("Missing \"url\"")),
        }
    }

    /// Delete everything. Returns the number of records removed.
    pub async fn cleanup(&self, token: Option<&str>) -> Result<u64> {
        self.authorize(token)?;
        let deleted = self.store.clear_all().await?;
        info!(deleted, "Store cleared");
        Ok(deleted)
    }

    /// Pull mentions from the aggregator, translate them, and bulk store
    /// them grouped by page. Aggregator mentions are already verified and
    /// skip the pending queue.
    pub async fn import(
        &self,
        token: Option<&str>,
        aggregator_token: Option<&str>,
    ) -> Result<ImportSummary> {
        self.authorize(token)?;
        let Some(aggregator_token) = aggregator_token.filter(|t| !t.is_empty()) else {
            return Err(WebmentionError::validation("Missing \"webmentionio\" token"));
        };
        let Some(feed) = &self.feed else {
            return Err(WebmentionError::Upstream(
                "No mention aggregator configured".to_string(),
            ));
        };

        let entries = feed.fetch(aggregator_token).await?;
        let mut summary = ImportSummary {
            fetched: entries.len(),
            ..Default::default()
        };

        let mut by_page: BTreeMap<String, Vec<Mention>> = BTreeMap::new();
        for entry in &entries {
            match self.importable(entry) {
                Ok((page, mention)) => by_page.entry(page).or_default().push(mention),
                Err(e) => {
                    warn!(error = %e, "Skipping aggregator entry");
                    summary.skipped += 1;
                }
            }
        }

        for (page, mentions) in by_page {
            let report = self.store.store_mentions_for_page(&page, mentions).await?;
            summary.skipped += report.failed.len();
            if report.stored_count() > 0 {
                summary.imported += report.stored_count();
                summary.targets += 1;
            }
        }

        info!(
            fetched = summary.fetched,
            imported = summary.imported,
            skipped = summary.skipped,
            targets = summary.targets,
            "Aggregator import complete"
        );
        Ok(summary)
    }

    fn importable(&self, entry: &serde_json::Value) -> Result<(String, Mention)> {
        let mut mention = translate(entry)?;
        let target = Url::parse(&mention.target)
            .map_err(|_| WebmentionError::validation(format!("Invalid target {}", mention.target)))?;
        self.supported_hosts.check(&target)?;
        let page = page_key(&mention.target)?;
        mention.retarget(page.clone());
        Ok((page, mention))
    }

    fn authorize(&self, token: Option<&str>) -> Result<()> {
        authorize(self.token.as_deref(), token)
    }
}
