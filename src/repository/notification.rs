//! Notification record repository.
//!
//! Dispatch idempotency lives here: `try_claim` does an INSERT OR IGNORE
//! against the `(user_id, posting_id)` uniqueness constraint, and only
//! the caller whose insert landed may send. Everything after the claim
//! is best-effort bookkeeping.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{NewNotificationRecord, NotificationRecordRow};
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{NotificationChannel, NotificationRecord};
use crate::schema::notification_records;

impl From<NotificationRecordRow> for NotificationRecord {
    fn from(row: NotificationRecordRow) -> Self {
        NotificationRecord {
            id: row.id,
            user_id: row.user_id,
            posting_id: row.posting_id,
            channel: NotificationChannel::parse(&row.channel).unwrap_or(NotificationChannel::Push),
            notified_at: parse_datetime(&row.notified_at),
            delivered: row.delivered,
            is_read: row.is_read,
            is_saved: row.is_saved,
            applied: row.applied,
        }
    }
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: AsyncSqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Claim the right to notify a user about a posting.
    ///
    /// Returns true if this call created the record. False means another
    /// dispatch already claimed the pair; the caller must not send.
    pub async fn try_claim(
        &self,
        user_id: &str,
        posting_id: &str,
        channel: NotificationChannel,
        now: DateTime<Utc>,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let stamp = now.to_rfc3339();

        let rows = diesel::insert_or_ignore_into(notification_records::table)
            .values(&NewNotificationRecord {
                user_id,
                posting_id,
                channel: channel.as_str(),
                notified_at: &stamp,
                delivered: false,
            })
            .execute(&mut conn)
            .await?;

        Ok(rows == 1)
    }

    /// Mark a claimed notification as delivered.
    pub async fn mark_delivered(
        &self,
        user_id: &str,
        posting_id: &str,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::update(
            notification_records::table
                .filter(notification_records::user_id.eq(user_id))
                .filter(notification_records::posting_id.eq(posting_id)),
        )
        .set(notification_records::delivered.eq(true))
        .execute(&mut conn)
        .await?;

        Ok(())
    }

    /// All records for one user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationRecord>, DieselError> {
        let mut conn = self.pool.get().await?;

        notification_records::table
            .filter(notification_records::user_id.eq(user_id))
            .order(notification_records::id.desc())
            .load::<NotificationRecordRow>(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(NotificationRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel_async::SimpleAsyncConnection;
    use tempfile::tempdir;

    async fn setup_test_db() -> (AsyncSqlitePool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));

        let mut conn = pool.get().await.unwrap();
        conn.batch_execute(
            r#"CREATE TABLE IF NOT EXISTS notification_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                posting_id TEXT NOT NULL,
                channel TEXT NOT NULL DEFAULT 'push',
                notified_at TEXT NOT NULL,
                delivered BOOLEAN NOT NULL DEFAULT 0,
                is_read BOOLEAN NOT NULL DEFAULT 0,
                is_saved BOOLEAN NOT NULL DEFAULT 0,
                applied BOOLEAN NOT NULL DEFAULT 0,
                UNIQUE(user_id, posting_id)
            )"#,
        )
        .await
        .unwrap();

        (pool, dir)
    }

    #[tokio::test]
    async fn test_claim_is_at_most_once() {
        let (pool, _dir) = setup_test_db().await;
        let repo = NotificationRepository::new(pool);
        let now = Utc::now();

        let first = repo
            .try_claim("u1", "p1", NotificationChannel::Push, now)
            .await
            .unwrap();
        assert!(first);

        // Same pair again: the constraint rejects the duplicate.
        let second = repo
            .try_claim("u1", "p1", NotificationChannel::Push, now)
            .await
            .unwrap();
        assert!(!second);

        // Different posting is a fresh claim.
        assert!(repo
            .try_claim("u1", "p2", NotificationChannel::Push, now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_mark_delivered() {
        let (pool, _dir) = setup_test_db().await;
        let repo = NotificationRepository::new(pool);
        let now = Utc::now();

        repo.try_claim("u1", "p1", NotificationChannel::Push, now)
            .await
            .unwrap();
        repo.mark_delivered("u1", "p1").await.unwrap();

        let records = repo.list_for_user("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].delivered);
        assert!(!records[0].is_read);
    }
}
