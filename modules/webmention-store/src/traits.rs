use std::collections::BTreeMap;

use async_trait::async_trait;

use webmention_common::{
    parse_mention_url, Mention, MentionType, PendingMention, Result, WebmentionError,
};

/// Outcome of a bulk write. Failures are per item; the rest still commit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BulkStoreReport {
    /// Sources committed, in input order.
    pub stored: Vec<String>,
    /// `(source, error message)` for items that failed.
    pub failed: Vec<(String, String)>,
}

impl BulkStoreReport {
    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }
}

/// Key a page by its parsed, serialized URL so equivalent spellings
/// (`https://Example.com` / `https://example.com/`) share one partition.
pub fn page_key(target: &str) -> Result<String> {
    Ok(parse_mention_url("url", target)?.to_string())
}

#[async_trait]
pub trait MentionStore: Send + Sync {
    /// Upsert one mention under `target`. Replaces any existing entry in the
    /// same `(source, type)` slot. Atomic per call.
    async fn store_mention_for_page(&self, target: &str, mention: Mention) -> Result<()>;

    /// Bulk upsert. Equivalent to looping the single form; a failing item does
    /// not prevent the others from committing.
    async fn store_mentions_for_page(
        &self,
        target: &str,
        mentions: Vec<Mention>,
    ) -> Result<BulkStoreReport> {
        let mut report = BulkStoreReport::default();
        for mention in mentions {
            let source = mention.source.clone();
            match self.store_mention_for_page(target, mention).await {
                Ok(()) => report.stored.push(source),
                Err(e) => {
                    tracing::warn!(page = target, source = %source, error = %e, "Failed to store mention");
                    report.failed.push((source, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// All mentions stored for `target`, optionally filtered by type.
    /// Unknown targets yield an empty list; malformed targets are a
    /// validation error.
    async fn get_mentions_for_page(
        &self,
        target: &str,
        mention_type: Option<MentionType>,
    ) -> Result<Vec<Mention>>;

    /// Every stored mention, grouped by page. Administrative use only.
    async fn get_all_mentions(&self) -> Result<BTreeMap<String, Vec<Mention>>>;

    /// Append to the pending list. Must be safe under concurrent callers.
    async fn add_pending_mention(&self, pending: PendingMention) -> Result<()>;

    /// Remove and return the next pending batch, oldest first. Each pending
    /// item is handed to at most one concurrent caller.
    async fn get_next_pending_mentions(&self) -> Result<Vec<PendingMention>>;

    /// Delete every pending and stored record. Returns how many were deleted.
    async fn clear_all(&self) -> Result<u64>;
}

/// Shared validation for `store_mention_for_page` implementations.
pub(crate) fn checked_page_key(target: &str, mention: &Mention) -> Result<String> {
    let key = page_key(target)?;
    if page_key(&mention.target)? != key {
        return Err(WebmentionError::validation(format!(
            "Mention target {} does not belong to page {}",
            mention.target, target
        )));
    }
    parse_mention_url("source", &mention.source)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_key_normalizes_equivalent_urls() {
        assert_eq!(
            page_key("https://MySite.example").unwrap(),
            page_key("https://mysite.example/").unwrap()
        );
        assert_ne!(
            page_key("https://mysite.example/a").unwrap(),
            page_key("https://mysite.example/b").unwrap()
        );
    }

    #[test]
    fn page_key_rejects_malformed_targets() {
        assert!(matches!(
            page_key("not a url"),
            Err(WebmentionError::Validation(_))
        ));
    }
}
