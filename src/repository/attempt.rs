//! Scrape attempt repository. Read side of the append-only audit trail
//! plus retention cleanup; rows are written by the pipeline commit.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ScrapeAttemptRecord;
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{AttemptStatus, ScrapeAttempt};
use crate::schema::scrape_attempts;

impl From<ScrapeAttemptRecord> for ScrapeAttempt {
    fn from(record: ScrapeAttemptRecord) -> Self {
        ScrapeAttempt {
            id: record.id,
            source_id: record.source_id,
            status: AttemptStatus::parse(&record.status).unwrap_or(AttemptStatus::Failed),
            postings_found: record.postings_found,
            new_postings: record.new_postings,
            updated_postings: record.updated_postings,
            duration_ms: record.duration_ms,
            error_message: record.error_message,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct AttemptRepository {
    pool: AsyncSqlitePool,
}

impl AttemptRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Recent attempts, optionally filtered to one source, newest first.
    pub async fn recent(
        &self,
        source_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ScrapeAttempt>, DieselError> {
        let mut conn = self.pool.get().await?;

        let mut query = scrape_attempts::table.into_boxed();
        if let Some(source_id) = source_id {
            query = query.filter(scrape_attempts::source_id.eq(source_id));
        }

        query
            .order(scrape_attempts::id.desc())
            .limit(limit)
            .load::<ScrapeAttemptRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(ScrapeAttempt::from).collect())
    }

    /// Delete attempts older than the cutoff. Returns the number removed.
    pub async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let stamp = cutoff.to_rfc3339();

        // RFC 3339 strings in UTC sort chronologically.
        diesel::delete(scrape_attempts::table.filter(scrape_attempts::created_at.lt(stamp)))
            .execute(&mut conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::models::NewScrapeAttempt;
    use chrono::Duration;
    use diesel_async::SimpleAsyncConnection;
    use tempfile::tempdir;

    async fn setup_test_db() -> (AsyncSqlitePool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));

        let mut conn = pool.get().await.unwrap();
        conn.batch_execute(
            r#"CREATE TABLE IF NOT EXISTS scrape_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id TEXT NOT NULL,
                status TEXT NOT NULL,
                postings_found INTEGER NOT NULL DEFAULT 0,
                new_postings INTEGER NOT NULL DEFAULT 0,
                updated_postings INTEGER NOT NULL DEFAULT 0,
                duration_ms INTEGER,
                error_message TEXT,
                created_at TEXT NOT NULL
            )"#,
        )
        .await
        .unwrap();

        (pool, dir)
    }

    /// Seed one row the way the pipeline commit writes them.
    async fn seed_attempt(
        pool: &AsyncSqlitePool,
        source_id: &str,
        status: AttemptStatus,
        error_message: Option<&str>,
        created_at: DateTime<Utc>,
    ) {
        let mut conn = pool.get().await.unwrap();
        let stamp = created_at.to_rfc3339();

        diesel::insert_into(scrape_attempts::table)
            .values(&NewScrapeAttempt {
                source_id,
                status: status.as_str(),
                postings_found: 0,
                new_postings: 0,
                updated_postings: 0,
                duration_ms: None,
                error_message,
                created_at: &stamp,
            })
            .execute(&mut conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recent_orders_and_filters() {
        let (pool, _dir) = setup_test_db().await;
        let repo = AttemptRepository::new(pool.clone());
        let now = Utc::now();

        seed_attempt(&pool, "s1", AttemptStatus::Failed, Some("HTTP 500"), now).await;
        seed_attempt(&pool, "s2", AttemptStatus::Success, None, now).await;

        let all = repo.recent(None, 10).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert_eq!(all[0].source_id, "s2");

        let s1_only = repo.recent(Some("s1"), 10).await.unwrap();
        assert_eq!(s1_only.len(), 1);
        assert_eq!(s1_only[0].status, AttemptStatus::Failed);
        assert_eq!(s1_only[0].error_message.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_cleanup_older_than() {
        let (pool, _dir) = setup_test_db().await;
        let repo = AttemptRepository::new(pool.clone());
        let now = Utc::now();

        seed_attempt(
            &pool,
            "s1",
            AttemptStatus::Success,
            None,
            now - Duration::days(40),
        )
        .await;
        seed_attempt(&pool, "s1", AttemptStatus::Success, None, now).await;

        let removed = repo
            .cleanup_older_than(now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.recent(None, 10).await.unwrap().len(), 1);
    }
}
