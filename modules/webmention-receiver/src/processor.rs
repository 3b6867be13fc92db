//! Processing cycle: drain → verify → classify → dedup → commit → notify.
//!
//! Each pending item is handled independently. A failing item is logged and
//! counted, never propagated; the cycle only errors when the queue itself
//! cannot be drained.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use webmention_common::{Mention, PendingMention, Result};
use webmention_store::{page_key, MentionStore};

use crate::dedup::is_equivalent;
use crate::notify::{Notifier, NotifyEvent};
use crate::verifier::{VerifiedMention, Verifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Added,
    Updated,
    /// Equivalent to what is already stored; nothing written.
    Unchanged,
    /// Verification failed or timed out.
    Dropped,
    /// Storage failed while committing.
    Failed,
}

/// Per-cycle counters, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub drained: usize,
    /// Repeat submissions of a `(source, target)` pair already in this batch.
    pub duplicates: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub dropped: usize,
    pub failed: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Added => self.added += 1,
            ItemOutcome::Updated => self.updated += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::Dropped => self.dropped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct MentionProcessor {
    store: Arc<dyn MentionStore>,
    verifier: Arc<dyn Verifier>,
    notifier: Arc<dyn Notifier>,
    verify_timeout: Duration,
    concurrency: usize,
}

impl MentionProcessor {
    pub fn new(
        store: Arc<dyn MentionStore>,
        verifier: Arc<dyn Verifier>,
        notifier: Arc<dyn Notifier>,
        verify_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            verifier,
            notifier,
            verify_timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let pending = self.store.get_next_pending_mentions().await?;
        let mut summary = CycleSummary {
            drained: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return Ok(summary);
        }

        // Keep the first submission of each pair; later ones add nothing
        let mut seen = HashSet::new();
        let batch: Vec<PendingMention> = pending
            .into_iter()
            .filter(|p| seen.insert((p.source.clone(), p.target.clone())))
            .collect();
        summary.duplicates = summary.drained - batch.len();

        let outcomes: Vec<ItemOutcome> = stream::iter(batch)
            .map(|p| self.process_item(p))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            summary.record(outcome);
        }

        info!(
            drained = summary.drained,
            added = summary.added,
            updated = summary.updated,
            unchanged = summary.unchanged,
            dropped = summary.dropped,
            failed = summary.failed,
            "Processing cycle complete"
        );
        Ok(summary)
    }

    async fn process_item(&self, pending: PendingMention) -> ItemOutcome {
        let verified = match tokio::time::timeout(
            self.verify_timeout,
            self.verifier.verify(&pending.source, &pending.target),
        )
        .await
        {
            Ok(Ok(verified)) => verified,
            Ok(Err(e)) => {
                warn!(source = %pending.source, page = %pending.target, error = %e, "Dropping unverified webmention");
                return ItemOutcome::Dropped;
            }
            Err(_) => {
                warn!(
                    source = %pending.source,
                    page = %pending.target,
                    timeout_secs = self.verify_timeout.as_secs_f64(),
                    "Verification timed out, dropping webmention"
                );
                return ItemOutcome::Dropped;
            }
        };

        let mention = build_mention(&pending, verified);
        match self.commit(mention).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(source = %pending.source, page = %pending.target, error = %e, "Failed to store webmention");
                ItemOutcome::Failed
            }
        }
    }

    /// Store the mention unless an equivalent one already occupies its slot.
    async fn commit(&self, mut mention: Mention) -> Result<ItemOutcome> {
        mention.retarget(page_key(&mention.target)?);
        let existing = self
            .store
            .get_mentions_for_page(&mention.target, Some(mention.mention_type))
            .await?;
        let previous = existing.iter().find(|m| m.same_slot(&mention));

        let event = match previous {
            Some(prev) if is_equivalent(prev, &mention) => return Ok(ItemOutcome::Unchanged),
            Some(_) => NotifyEvent::Updated,
            None => NotifyEvent::Added,
        };

        let (source, target) = (mention.source.clone(), mention.target.clone());
        self.store
            .store_mention_for_page(&target, mention)
            .await?;

        if let Err(e) = self.notifier.notify(&source, &target, event).await {
            warn!(source = %source, page = %target, error = %e, "Notification failed");
        }

        Ok(match event {
            NotifyEvent::Updated => ItemOutcome::Updated,
            _ => ItemOutcome::Added,
        })
    }
}

fn build_mention(pending: &PendingMention, verified: VerifiedMention) -> Mention {
    let mut mention = Mention::new(
        pending.source.clone(),
        pending.target.clone(),
        verified.mention_type,
        pending.received_at,
    );
    mention.parsed_at = Some(Utc::now());
    mention.url = verified.url;
    mention.content = verified.content;
    mention.author = verified.author;
    if let Some(tag) = verified.mention_type.property_tag() {
        mention.properties.insert(
            tag.to_string(),
            serde_json::Value::String(pending.target.clone()),
        );
    }
    mention
}

