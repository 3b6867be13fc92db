//! Storage contract tests, run against every implementation.
//! Postgres runs only when DATABASE_TEST_URL is set; otherwise those tests are skipped.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use webmention_common::{Mention, MentionType, PendingMention, WebmentionError};
use webmention_store::{MemoryStore, MentionStore, PgMentionStore};

const ARTICLE: &str = "https://mysite.example/article";
const NOTES: &str = "https://mysite.example/notes/1";

fn mention(source: &str, target: &str, mention_type: MentionType) -> Mention {
    Mention::new(source, target, mention_type, Utc::now())
}

// ---------------------------------------------------------------------------
// Shared scenarios
// ---------------------------------------------------------------------------

async fn unknown_target_is_empty(store: &dyn MentionStore) {
    let mentions = store
        .get_mentions_for_page("https://mysite.example/never-mentioned", None)
        .await
        .unwrap();
    assert!(mentions.is_empty());
}

async fn malformed_target_is_rejected(store: &dyn MentionStore) {
    let err = store.get_mentions_for_page("::nope::", None).await.unwrap_err();
    assert!(matches!(err, WebmentionError::Validation(_)));
}

async fn bulk_store_commits_the_good_items(store: &dyn MentionStore) {
    let report = store
        .store_mentions_for_page(
            ARTICLE,
            vec![
                mention("https://a.example/1", ARTICLE, MentionType::Like),
                mention("not a url", ARTICLE, MentionType::Like),
                mention("https://b.example/2", ARTICLE, MentionType::Reply),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.stored, vec!["https://a.example/1", "https://b.example/2"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "not a url");

    let stored = store.get_mentions_for_page(ARTICLE, None).await.unwrap();
    assert_eq!(stored.len(), 2);
}

async fn clear_all_counts_pending_and_stored(store: &dyn MentionStore) {
    store
        .store_mention_for_page(ARTICLE, mention("https://a.example/1", ARTICLE, MentionType::Like))
        .await
        .unwrap();
    store
        .store_mention_for_page(NOTES, mention("https://a.example/1", NOTES, MentionType::Reply))
        .await
        .unwrap();
    for n in 0..3 {
        store
            .add_pending_mention(PendingMention::new(format!("https://c.example/{n}"), ARTICLE))
            .await
            .unwrap();
    }

    assert_eq!(store.clear_all().await.unwrap(), 5);
    assert!(store.get_mentions_for_page(ARTICLE, None).await.unwrap().is_empty());
    assert!(store.get_all_mentions().await.unwrap().is_empty());
    assert!(store.get_next_pending_mentions().await.unwrap().is_empty());
}

async fn get_all_groups_by_page(store: &dyn MentionStore) {
    store
        .store_mention_for_page(ARTICLE, mention("https://a.example/1", ARTICLE, MentionType::Like))
        .await
        .unwrap();
    store
        .store_mention_for_page(NOTES, mention("https://b.example/1", NOTES, MentionType::Repost))
        .await
        .unwrap();

    let all = store.get_all_mentions().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[ARTICLE][0].source, "https://a.example/1");
    assert_eq!(all[NOTES][0].mention_type, MentionType::Repost);
}

// ---------------------------------------------------------------------------
// Memory store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn memory_unknown_target_is_empty() {
    unknown_target_is_empty(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_malformed_target_is_rejected() {
    malformed_target_is_rejected(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_bulk_store_commits_the_good_items() {
    bulk_store_commits_the_good_items(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_clear_all_counts_pending_and_stored() {
    clear_all_counts_pending_and_stored(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_get_all_groups_by_page() {
    get_all_groups_by_page(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_concurrent_drains_never_share_items() {
    let store = Arc::new(MemoryStore::new());

    let appends = (0..50).map(|n| {
        let store = store.clone();
        async move {
            store
                .add_pending_mention(PendingMention::new(format!("https://a.example/{n}"), ARTICLE))
                .await
                .unwrap();
        }
    });
    futures::future::join_all(appends).await;
    assert_eq!(store.pending().len(), 50);

    let drains = (0..4).map(|_| {
        let store = store.clone();
        tokio::spawn(async move { store.get_next_pending_mentions().await.unwrap() })
    });
    let batches = futures::future::join_all(drains).await;

    let mut seen = HashSet::new();
    let mut total = 0;
    for batch in batches {
        for pending in batch.unwrap() {
            total += 1;
            assert!(seen.insert(pending.id), "pending item handed out twice");
        }
    }
    assert_eq!(total, 50);
}

// ---------------------------------------------------------------------------
// Postgres store
// ---------------------------------------------------------------------------

async fn test_store() -> Option<PgMentionStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgMentionStore::new(pool, 100);
    store.migrate().await.ok()?;
    store.clear_all().await.ok()?;
    Some(store)
}

// One test drives every scenario so parallel tests don't share tables.
#[tokio::test]
async fn postgres_store_honours_the_contract() {
    let Some(store) = test_store().await else {
        return;
    };

    unknown_target_is_empty(&store).await;
    malformed_target_is_rejected(&store).await;
    bulk_store_commits_the_good_items(&store).await;
    clear_all_counts_pending_and_stored(&store).await;
    get_all_groups_by_page(&store).await;
    store.clear_all().await.unwrap();

    // Upsert replaces the (source, type) slot
    let mut reply = mention("https://a.example/1", ARTICLE, MentionType::Reply);
    store.store_mention_for_page(ARTICLE, reply.clone()).await.unwrap();
    reply.id = Some("42".into());
    store.store_mention_for_page(ARTICLE, reply).await.unwrap();
    let stored = store
        .get_mentions_for_page(ARTICLE, Some(MentionType::Reply))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id.as_deref(), Some("42"));

    // Drain is FIFO and exclusive
    for n in 0..3 {
        store
            .add_pending_mention(PendingMention::new(format!("https://c.example/{n}"), ARTICLE))
            .await
            .unwrap();
    }
    let drained = store.get_next_pending_mentions().await.unwrap();
    assert_eq!(drained.len(), 3);
    assert_eq!(drained[0].source, "https://c.example/0");
    assert!(store.get_next_pending_mentions().await.unwrap().is_empty());

    store.clear_all().await.unwrap();
}
