//! Transactional commit of one scrape run.
//!
//! A run's effects land atomically: posting inserts and updates, the
//! source's health fields, and exactly one scrape attempt row. Crashing
//! mid-run leaves either the whole outcome or none of it.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{NewPosting, NewScrapeAttempt, PostingRecord};
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{AttemptStatus, Posting, Source};
use crate::scrapers::NormalizedPosting;
use crate::schema::{postings, scrape_attempts, sources};

/// Outcome counts of one committed run.
#[derive(Debug, Clone, Default)]
pub struct RunCounts {
    pub found: usize,
    /// IDs of postings first seen in this run, in batch order.
    pub new_posting_ids: Vec<String>,
    pub updated: usize,
}

#[derive(Clone)]
pub struct PipelineRepository {
    pool: AsyncSqlitePool,
}

impl PipelineRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Commit a successful run: dedup and persist the batch, persist the
    /// source's updated health, and record the attempt.
    ///
    /// `source` must already carry the post-run health state
    /// (`record_success` applied).
    pub async fn commit_success(
        &self,
        source: &Source,
        batch: &[NormalizedPosting],
        duration_ms: i32,
        now: DateTime<Utc>,
    ) -> Result<RunCounts, DieselError> {
        let mut conn = self.pool.get().await?;

        // Candidate rows are built up front; identity resolution happens
        // inside the transaction.
        let candidates: Vec<NewPosting> = batch
            .iter()
            .map(|n| to_new_posting(n, &source.id, &source.company_id, now))
            .collect();

        let source_update = SourceHealthUpdate::from_source(source);
        let source_id = source.id.clone();
        let found = batch.len();
        let stamp = now.to_rfc3339();

        conn.transaction(|conn| {
            async move {
                let mut counts = RunCounts {
                    found,
                    ..RunCounts::default()
                };

                for candidate in candidates {
                    let existing: Option<PostingRecord> = postings::table
                        .filter(postings::source_id.eq(&candidate.source_id))
                        .filter(postings::external_id.eq(&candidate.external_id))
                        .first(conn)
                        .await
                        .optional()?;

                    match existing {
                        Some(record) => {
                            // Re-sighting: only the description may change.
                            if record.description != candidate.description {
                                diesel::update(postings::table.find(&record.id))
                                    .set(postings::description.eq(&candidate.description))
                                    .execute(conn)
                                    .await?;
                                counts.updated += 1;
                            }
                        }
                        None => {
                            // INSERT OR IGNORE arbitrates races with a
                            // concurrent run of the same source.
                            let id = candidate.id.clone();
                            let rows = diesel::insert_or_ignore_into(postings::table)
                                .values(&candidate)
                                .execute(conn)
                                .await?;
                            if rows == 1 {
                                counts.new_posting_ids.push(id);
                            }
                        }
                    }
                }

                source_update.apply(conn).await?;

                diesel::insert_into(scrape_attempts::table)
                    .values(&NewScrapeAttempt {
                        source_id: &source_id,
                        status: AttemptStatus::Success.as_str(),
                        postings_found: counts.found as i32,
                        new_postings: counts.new_posting_ids.len() as i32,
                        updated_postings: counts.updated as i32,
                        duration_ms: Some(duration_ms),
                        error_message: None,
                        created_at: &stamp,
                    })
                    .execute(conn)
                    .await?;

                Ok(counts)
            }
            .scope_boxed()
        })
        .await
    }

    /// Commit a failed run: persist the source's degraded health and
    /// record the attempt with its error summary.
    pub async fn commit_failure(
        &self,
        source: &Source,
        status: AttemptStatus,
        error_summary: &str,
        duration_ms: i32,
        now: DateTime<Utc>,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let source_update = SourceHealthUpdate::from_source(source);
        let source_id = source.id.clone();
        let error = error_summary.to_string();
        let stamp = now.to_rfc3339();

        conn.transaction(|conn| {
            async move {
                source_update.apply(conn).await?;

                diesel::insert_into(scrape_attempts::table)
                    .values(&NewScrapeAttempt {
                        source_id: &source_id,
                        status: status.as_str(),
                        postings_found: 0,
                        new_postings: 0,
                        updated_postings: 0,
                        duration_ms: Some(duration_ms),
                        error_message: Some(&error),
                        created_at: &stamp,
                    })
                    .execute(conn)
                    .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }
}

/// Owned snapshot of the health fields a run may change.
struct SourceHealthUpdate {
    id: String,
    is_active: bool,
    health_status: &'static str,
    consecutive_failures: i32,
    last_scraped_at: Option<String>,
    last_success_at: Option<String>,
}

impl SourceHealthUpdate {
    fn from_source(source: &Source) -> Self {
        Self {
            id: source.id.clone(),
            is_active: source.is_active,
            health_status: source.health_status.as_str(),
            consecutive_failures: source.consecutive_failures,
            last_scraped_at: source.last_scraped_at.map(|dt| dt.to_rfc3339()),
            last_success_at: source.last_success_at.map(|dt| dt.to_rfc3339()),
        }
    }

    async fn apply(
        &self,
        conn: &mut super::pool::AsyncSqliteConnection,
    ) -> Result<(), DieselError> {
        diesel::update(sources::table.find(&self.id))
            .set((
                sources::is_active.eq(self.is_active),
                sources::health_status.eq(self.health_status),
                sources::consecutive_failures.eq(self.consecutive_failures),
                sources::last_scraped_at.eq(&self.last_scraped_at),
                sources::last_success_at.eq(&self.last_success_at),
            ))
            .execute(conn)
            .await?;
        Ok(())
    }
}

fn to_new_posting(
    normalized: &NormalizedPosting,
    source_id: &str,
    company_id: &str,
    now: DateTime<Utc>,
) -> NewPosting {
    let posting = Posting::from_normalized(normalized, source_id, company_id, now);
    NewPosting {
        id: posting.id,
        source_id: posting.source_id,
        company_id: posting.company_id,
        external_id: posting.external_id,
        title: posting.title,
        description: posting.description,
        location: posting.location,
        location_type: posting.location_type.map(|lt| lt.as_str().to_string()),
        employment_type: posting.employment_type.map(|et| et.as_str().to_string()),
        seniority: posting.seniority.map(|s| s.as_str().to_string()),
        apply_url: posting.apply_url,
        salary_min: posting.salary_min,
        salary_max: posting.salary_max,
        salary_currency: posting.salary_currency,
        posted_at: posting.posted_at.map(|dt| dt.to_rfc3339()),
        discovered_at: posting.discovered_at.to_rfc3339(),
        is_active: true,
        raw: posting.raw.to_string(),
    }
}
