//! Diesel-based source repository for SQLite.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! while maintaining Diesel's compile-time query checking.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::SourceRecord;
use super::pool::{AsyncSqlitePool, DieselError};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{HealthStatus, Source};
use crate::schema::sources;

/// Convert a database record to a domain model.
impl From<SourceRecord> for Source {
    fn from(record: SourceRecord) -> Self {
        Source {
            id: record.id,
            company_id: record.company_id,
            source_type: record.source_type,
            url: record.url,
            config: serde_json::from_str(&record.config).unwrap_or_default(),
            scrape_interval_minutes: record.scrape_interval_minutes,
            is_active: record.is_active,
            health_status: HealthStatus::parse(&record.health_status)
                .unwrap_or(HealthStatus::Unknown),
            consecutive_failures: record.consecutive_failures,
            last_scraped_at: parse_datetime_opt(record.last_scraped_at),
            last_success_at: parse_datetime_opt(record.last_success_at),
            created_at: parse_datetime(&record.created_at),
        }
    }
}

/// Diesel-based source repository with compile-time query checking.
#[derive(Clone)]
pub struct SourceRepository {
    pool: AsyncSqlitePool,
}

impl SourceRepository {
    /// Create a new source repository with an existing pool.
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a source by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Source>, DieselError> {
        let mut conn = self.pool.get().await?;

        sources::table
            .find(id)
            .first::<SourceRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Source::from))
    }

    /// Get all sources.
    pub async fn get_all(&self) -> Result<Vec<Source>, DieselError> {
        let mut conn = self.pool.get().await?;

        sources::table
            .order(sources::created_at.asc())
            .load::<SourceRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Source::from).collect())
    }

    /// Get all sources for one company.
    pub async fn get_by_company(&self, company_id: &str) -> Result<Vec<Source>, DieselError> {
        let mut conn = self.pool.get().await?;

        sources::table
            .filter(sources::company_id.eq(company_id))
            .order(sources::created_at.asc())
            .load::<SourceRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Source::from).collect())
    }

    /// Save a source (insert or update using REPLACE).
    pub async fn save(&self, source: &Source) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let config_json =
            serde_json::to_string(&source.config).unwrap_or_else(|_| "{}".to_string());
        let created_at = source.created_at.to_rfc3339();
        let last_scraped_at = source.last_scraped_at.map(|dt| dt.to_rfc3339());
        let last_success_at = source.last_success_at.map(|dt| dt.to_rfc3339());

        diesel::replace_into(sources::table)
            .values((
                sources::id.eq(&source.id),
                sources::company_id.eq(&source.company_id),
                sources::source_type.eq(&source.source_type),
                sources::url.eq(&source.url),
                sources::config.eq(&config_json),
                sources::scrape_interval_minutes.eq(source.scrape_interval_minutes),
                sources::is_active.eq(source.is_active),
                sources::health_status.eq(source.health_status.as_str()),
                sources::consecutive_failures.eq(source.consecutive_failures),
                sources::last_scraped_at.eq(&last_scraped_at),
                sources::last_success_at.eq(&last_success_at),
                sources::created_at.eq(&created_at),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Check if a source exists.
    pub async fn exists(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = sources::table
            .filter(sources::id.eq(id))
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }

    /// Enable or disable a source. Enabling also clears health state so
    /// the next scrape starts from a clean slate.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = if enabled {
            diesel::update(sources::table.find(id))
                .set((
                    sources::is_active.eq(true),
                    sources::health_status.eq(HealthStatus::Unknown.as_str()),
                    sources::consecutive_failures.eq(0),
                ))
                .execute(&mut conn)
                .await?
        } else {
            diesel::update(sources::table.find(id))
                .set(sources::is_active.eq(false))
                .execute(&mut conn)
                .await?
        };

        Ok(rows > 0)
    }

    /// Claim every source due for a scrape at `now`.
    ///
    /// Selecting and stamping `last_scraped_at` happen in one
    /// transaction, so a source claimed here stops being due
    /// immediately. Two overlapping scheduler ticks cannot dispatch the
    /// same source twice.
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Source>, DieselError> {
        let mut conn = self.pool.get().await?;
        let stamp = now.to_rfc3339();

        conn.transaction(|conn| {
            async move {
                let active: Vec<SourceRecord> = sources::table
                    .filter(sources::is_active.eq(true))
                    .load(conn)
                    .await?;

                let due: Vec<Source> = active
                    .into_iter()
                    .map(Source::from)
                    .filter(|s| s.is_due(now))
                    .collect();

                for source in &due {
                    diesel::update(sources::table.find(&source.id))
                        .set(sources::last_scraped_at.eq(Some(&stamp)))
                        .execute(conn)
                        .await?;
                }

                Ok(due)
            }
            .scope_boxed()
        })
        .await
    }

    /// Delete a source.
    pub async fn delete(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(sources::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }
}
