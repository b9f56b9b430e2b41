//! Posting repository.
//!
//! Read-side queries over postings. All write traffic goes through the
//! pipeline repository so that inserts, updates, health changes, and the
//! attempt record commit atomically.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{CompanyRecord, PostingRecord};
use super::pool::{AsyncSqlitePool, DieselError};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{Company, EmploymentType, LocationType, Posting, Seniority};
use crate::schema::{companies, postings};

impl From<PostingRecord> for Posting {
    fn from(record: PostingRecord) -> Self {
        Posting {
            id: record.id,
            source_id: record.source_id,
            company_id: record.company_id,
            external_id: record.external_id,
            title: record.title,
            description: record.description,
            location: record.location,
            location_type: record.location_type.as_deref().and_then(LocationType::parse),
            employment_type: record
                .employment_type
                .as_deref()
                .and_then(EmploymentType::parse),
            seniority: record.seniority.as_deref().and_then(Seniority::parse),
            apply_url: record.apply_url,
            salary_min: record.salary_min,
            salary_max: record.salary_max,
            salary_currency: record.salary_currency,
            posted_at: parse_datetime_opt(record.posted_at),
            discovered_at: parse_datetime(&record.discovered_at),
            is_active: record.is_active,
            raw: serde_json::from_str(&record.raw).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Clone)]
pub struct PostingRepository {
    pool: AsyncSqlitePool,
}

impl PostingRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a posting by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Posting>, DieselError> {
        let mut conn = self.pool.get().await?;

        postings::table
            .find(id)
            .first::<PostingRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Posting::from))
    }

    /// Get a posting joined with its company, for notification dispatch.
    pub async fn get_with_company(
        &self,
        id: &str,
    ) -> Result<Option<(Posting, Company)>, DieselError> {
        let mut conn = self.pool.get().await?;

        postings::table
            .find(id)
            .inner_join(companies::table)
            .select((PostingRecord::as_select(), CompanyRecord::as_select()))
            .first::<(PostingRecord, CompanyRecord)>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(|(p, c)| (Posting::from(p), Company::from(c))))
    }

    /// Look up a posting by its identity within a source.
    pub async fn find_by_external(
        &self,
        source_id: &str,
        external_id: &str,
    ) -> Result<Option<Posting>, DieselError> {
        let mut conn = self.pool.get().await?;

        postings::table
            .filter(postings::source_id.eq(source_id))
            .filter(postings::external_id.eq(external_id))
            .first::<PostingRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Posting::from))
    }

    /// Count postings for one source.
    pub async fn count_for_source(&self, source_id: &str) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        postings::table
            .filter(postings::source_id.eq(source_id))
            .select(count_star())
            .first(&mut conn)
            .await
    }

    /// Count all postings.
    pub async fn count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        postings::table.select(count_star()).first(&mut conn).await
    }

    /// Most recently discovered postings.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Posting>, DieselError> {
        let mut conn = self.pool.get().await?;

        postings::table
            .order(postings::discovered_at.desc())
            .limit(limit)
            .load::<PostingRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Posting::from).collect())
    }
}
