//! Company repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::CompanyRecord;
use super::parse_datetime;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::Company;
use crate::schema::companies;

impl From<CompanyRecord> for Company {
    fn from(record: CompanyRecord) -> Self {
        Company {
            id: record.id,
            name: record.name,
            slug: record.slug,
            website: record.website,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct CompanyRepository {
    pool: AsyncSqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Get a company by ID.
    pub async fn get(&self, id: &str) -> Result<Option<Company>, DieselError> {
        let mut conn = self.pool.get().await?;

        companies::table
            .find(id)
            .first::<CompanyRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Company::from))
    }

    /// Get a company by its slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Company>, DieselError> {
        let mut conn = self.pool.get().await?;

        companies::table
            .filter(companies::slug.eq(slug))
            .first::<CompanyRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Company::from))
    }

    /// Get all companies, sorted by name.
    pub async fn get_all(&self) -> Result<Vec<Company>, DieselError> {
        let mut conn = self.pool.get().await?;

        companies::table
            .order(companies::name.asc())
            .load::<CompanyRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Company::from).collect())
    }

    /// Save a company (insert or update using REPLACE).
    pub async fn save(&self, company: &Company) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        let created_at = company.created_at.to_rfc3339();

        diesel::replace_into(companies::table)
            .values((
                companies::id.eq(&company.id),
                companies::name.eq(&company.name),
                companies::slug.eq(&company.slug),
                companies::website.eq(&company.website),
                companies::created_at.eq(&created_at),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
