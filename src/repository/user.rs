//! User repository.
//!
//! Users are managed by the external API layer; the pipeline only reads
//! the notifiable set. `save` exists for seeding and tests.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::UserRecord;
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::User;
use crate::schema::users;

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            is_active: record.is_active,
            push_token: record.push_token,
            preferences: serde_json::from_str(&record.preferences).unwrap_or_default(),
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct UserRepository {
    pool: AsyncSqlitePool,
}

impl UserRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> Result<Option<User>, DieselError> {
        let mut conn = self.pool.get().await?;

        users::table
            .find(id)
            .first::<UserRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(User::from))
    }

    /// All users eligible for push delivery: active with a push token.
    pub async fn notifiable(&self) -> Result<Vec<User>, DieselError> {
        let mut conn = self.pool.get().await?;

        users::table
            .filter(users::is_active.eq(true))
            .filter(users::push_token.is_not_null())
            .load::<UserRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(User::from).collect())
    }

    /// Save a user (insert or update using REPLACE).
    pub async fn save(&self, user: &User) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let preferences_json =
            serde_json::to_string(&user.preferences).unwrap_or_else(|_| "{}".to_string());
        let created_at = user.created_at.to_rfc3339();

        diesel::replace_into(users::table)
            .values((
                users::id.eq(&user.id),
                users::email.eq(&user.email),
                users::is_active.eq(user.is_active),
                users::push_token.eq(&user.push_token),
                users::preferences.eq(&preferences_json),
                users::created_at.eq(&created_at),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPreferences;
    use chrono::Utc;
    use diesel_async::SimpleAsyncConnection;
    use tempfile::tempdir;

    async fn setup_test_db() -> (AsyncSqlitePool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));

        let mut conn = pool.get().await.unwrap();
        conn.batch_execute(
            r#"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                push_token TEXT,
                preferences TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )"#,
        )
        .await
        .unwrap();

        (pool, dir)
    }

    fn user(id: &str, push_token: Option<&str>, is_active: bool) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            is_active,
            push_token: push_token.map(String::from),
            preferences: UserPreferences::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notifiable_filters() {
        let (pool, _dir) = setup_test_db().await;
        let repo = UserRepository::new(pool);

        repo.save(&user("u1", Some("token-1"), true)).await.unwrap();
        repo.save(&user("u2", None, true)).await.unwrap();
        repo.save(&user("u3", Some("token-3"), false)).await.unwrap();

        let notifiable = repo.notifiable().await.unwrap();
        assert_eq!(notifiable.len(), 1);
        assert_eq!(notifiable[0].id, "u1");
    }
}
