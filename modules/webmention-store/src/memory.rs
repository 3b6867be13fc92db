//! In-memory reference store. Used when no database is configured, and by tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use webmention_common::{Mention, MentionType, PendingMention, Result, WebmentionError};

use crate::traits::{checked_page_key, page_key, MentionStore};

#[derive(Default)]
struct MemoryState {
    pages: BTreeMap<String, Vec<Mention>>,
    pending: VecDeque<PendingMention>,
    writes: u64,
}

/// Thread-safe in-memory store. Every operation holds the lock for its whole
/// duration, so writes and drains are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed mention writes (for test assertions).
    pub fn writes(&self) -> u64 {
        self.lock().map(|s| s.writes).unwrap_or(0)
    }

    /// Pending submissions not yet drained (for test assertions).
    pub fn pending(&self) -> Vec<PendingMention> {
        self.lock()
            .map(|s| s.pending.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| WebmentionError::storage("memory store lock poisoned"))
    }
}

#[async_trait]
impl MentionStore for MemoryStore {
    async fn store_mention_for_page(&self, target: &str, mut mention: Mention) -> Result<()> {
        let key = checked_page_key(target, &mention)?;
        mention.retarget(key.clone());
        let mut state = self.lock()?;
        let page = state.pages.entry(key).or_default();
        match page.iter_mut().find(|m| m.same_slot(&mention)) {
            Some(existing) => *existing = mention,
            None => page.push(mention),
        }
        state.writes += 1;
        Ok(())
    }

    async fn get_mentions_for_page(
        &self,
        target: &str,
        mention_type: Option<MentionType>,
    ) -> Result<Vec<Mention>> {
        let key = page_key(target)?;
        let state = self.lock()?;
        let Some(page) = state.pages.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(page
            .iter()
            .filter(|m| mention_type.map_or(true, |t| m.mention_type == t))
            .cloned()
            .collect())
    }

    async fn get_all_mentions(&self) -> Result<BTreeMap<String, Vec<Mention>>> {
        Ok(self.lock()?.pages.clone())
    }

    async fn add_pending_mention(&self, pending: PendingMention) -> Result<()> {
        self.lock()?.pending.push_back(pending);
        Ok(())
    }

    async fn get_next_pending_mentions(&self) -> Result<Vec<PendingMention>> {
        Ok(self.lock()?.pending.drain(..).collect())
    }

    async fn clear_all(&self) -> Result<u64> {
        let mut state = self.lock()?;
        let stored: usize = state.pages.values().map(Vec::len).sum();
        let pending = state.pending.len();
        state.pages.clear();
        state.pending.clear();
        Ok((stored + pending) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ARTICLE: &str = "https://mysite.example/article";

    fn mention(source: &str, mention_type: MentionType) -> Mention {
        Mention::new(source, ARTICLE, mention_type, Utc::now())
    }

    #[tokio::test]
    async fn upsert_replaces_same_source_and_type() {
        let store = MemoryStore::new();
        let mut first = mention("https://a.example/post", MentionType::Reply);
        first.id = Some("1".into());
        let mut second = first.clone();
        second.id = Some("2".into());

        store.store_mention_for_page(ARTICLE, first).await.unwrap();
        store.store_mention_for_page(ARTICLE, second).await.unwrap();

        let stored = store.get_mentions_for_page(ARTICLE, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id.as_deref(), Some("2"));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn differently_spelled_targets_share_one_slot() {
        let store = MemoryStore::new();
        let shouting = Mention::new(
            "https://a.example/post",
            "https://MySite.example/article",
            MentionType::Mention,
            Utc::now(),
        );
        store
            .store_mention_for_page("https://MySite.example/article", shouting)
            .await
            .unwrap();
        store
            .store_mention_for_page(ARTICLE, mention("https://a.example/post", MentionType::Mention))
            .await
            .unwrap();

        let stored = store.get_mentions_for_page(ARTICLE, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].target, ARTICLE);
    }

    #[tokio::test]
    async fn different_types_from_one_source_coexist() {
        let store = MemoryStore::new();
        store
            .store_mention_for_page(ARTICLE, mention("https://a.example/post", MentionType::Reply))
            .await
            .unwrap();
        store
            .store_mention_for_page(ARTICLE, mention("https://a.example/post", MentionType::Like))
            .await
            .unwrap();

        assert_eq!(store.get_mentions_for_page(ARTICLE, None).await.unwrap().len(), 2);
        let likes = store
            .get_mentions_for_page(ARTICLE, Some(MentionType::Like))
            .await
            .unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].mention_type, MentionType::Like);
    }

    #[tokio::test]
    async fn rejects_mention_filed_under_another_page() {
        let store = MemoryStore::new();
        let err = store
            .store_mention_for_page(
                "https://mysite.example/other",
                mention("https://a.example/post", MentionType::Like),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WebmentionError::Validation(_)));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn drain_is_fifo_and_empties_the_queue() {
        let store = MemoryStore::new();
        for n in 0..3 {
            store
                .add_pending_mention(PendingMention::new(format!("https://a.example/{n}"), ARTICLE))
                .await
                .unwrap();
        }

        let drained = store.get_next_pending_mentions().await.unwrap();
        let sources: Vec<_> = drained.iter().map(|p| p.source.as_str()).collect();
        assert_eq!(
            sources,
            vec!["https://a.example/0", "https://a.example/1", "https://a.example/2"]
        );
        assert!(store.get_next_pending_mentions().await.unwrap().is_empty());
    }
}
