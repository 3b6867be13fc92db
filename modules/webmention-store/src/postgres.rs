// Postgres-backed mention store.
//
// Stored mentions keep the full record as JSONB next to the slot key columns.
// Pending submissions are drained with `FOR UPDATE SKIP LOCKED` so two
// concurrent processing cycles never receive the same row.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use webmention_common::{
    Mention, MentionStatus, MentionType, PendingMention, Result, WebmentionError,
};

use crate::traits::{checked_page_key, page_key, MentionStore};

#[derive(Clone)]
pub struct PgMentionStore {
    pool: PgPool,
    batch_size: i64,
}

#[derive(sqlx::FromRow)]
struct PendingRow {
    id: Uuid,
    source: String,
    target: String,
    received_at: DateTime<Utc>,
}

impl From<PendingRow> for PendingMention {
    fn from(row: PendingRow) -> Self {
        PendingMention {
            id: row.id,
            source: row.source,
            target: row.target,
            received_at: row.received_at,
            status: MentionStatus::Pending,
        }
    }
}

impl PgMentionStore {
    /// `batch_size` caps how many pending rows one drain claims.
    pub fn new(pool: PgPool, batch_size: i64) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn connect(database_url: &str, batch_size: i64) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(WebmentionError::storage)?;
        Ok(Self::new(pool, batch_size))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(WebmentionError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl MentionStore for PgMentionStore {
    async fn store_mention_for_page(&self, target: &str, mut mention: Mention) -> Result<()> {
        let key = checked_page_key(target, &mention)?;
        mention.retarget(key.clone());
        sqlx::query(
            r#"
            INSERT INTO webmentions (target, source, mention_type, received_at, parsed_at, record)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (target, source, mention_type) DO UPDATE
            SET received_at = EXCLUDED.received_at,
                parsed_at   = EXCLUDED.parsed_at,
                record      = EXCLUDED.record,
                updated_at  = now()
            "#,
        )
        .bind(&key)
        .bind(&mention.source)
        .bind(mention.mention_type.to_string())
        .bind(mention.received_at)
        .bind(mention.parsed_at)
        .bind(Json(&mention))
        .execute(&self.pool)
        .await
        .map_err(WebmentionError::storage)?;
        Ok(())
    }

    async fn get_mentions_for_page(
        &self,
        target: &str,
        mention_type: Option<MentionType>,
    ) -> Result<Vec<Mention>> {
        let key = page_key(target)?;
        let rows = sqlx::query_as::<_, (Json<Mention>,)>(
            r#"
            SELECT record FROM webmentions
            WHERE target = $1
              AND ($2::text IS NULL OR mention_type = $2)
            ORDER BY received_at ASC
            "#,
        )
        .bind(&key)
        .bind(mention_type.map(|t| t.to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(WebmentionError::storage)?;

        Ok(rows.into_iter().map(|(Json(m),)| m).collect())
    }

    async fn get_all_mentions(&self) -> Result<BTreeMap<String, Vec<Mention>>> {
        let rows = sqlx::query_as::<_, (String, Json<Mention>)>(
            r#"
            SELECT target, record FROM webmentions
            ORDER BY target ASC, received_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(WebmentionError::storage)?;

        let mut pages: BTreeMap<String, Vec<Mention>> = BTreeMap::new();
        for (target, Json(mention)) in rows {
            pages.entry(target).or_default().push(mention);
        }
        Ok(pages)
    }

    async fn add_pending_mention(&self, pending: PendingMention) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_webmentions (id, source, target, received_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(pending.id)
        .bind(&pending.source)
        .bind(&pending.target)
        .bind(pending.received_at)
        .execute(&self.pool)
        .await
        .map_err(WebmentionError::storage)?;
        Ok(())
    }

    async fn get_next_pending_mentions(&self) -> Result<Vec<PendingMention>> {
        let mut rows = sqlx::query_as::<_, PendingRow>(
            r#"
            DELETE FROM pending_webmentions
            WHERE id IN (
                SELECT id FROM pending_webmentions
                ORDER BY received_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, source, target, received_at
            "#,
        )
        .bind(self.batch_size)
        .fetch_all(&self.pool)
        .await
        .map_err(WebmentionError::storage)?;

        // RETURNING order is unspecified
        rows.sort_by_key(|r| r.received_at);
        Ok(rows.into_iter().map(PendingMention::from).collect())
    }

    async fn clear_all(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(WebmentionError::storage)?;
        let pending = sqlx::query("DELETE FROM pending_webmentions")
            .execute(&mut *tx)
            .await
            .map_err(WebmentionError::storage)?
            .rows_affected();
        let stored = sqlx::query("DELETE FROM webmentions")
            .execute(&mut *tx)
            .await
            .map_err(WebmentionError::storage)?
            .rows_affected();
        tx.commit().await.map_err(WebmentionError::storage)?;

        tracing::info!(pending, stored, "Cleared webmention store");
        Ok(pending + stored)
    }
}
