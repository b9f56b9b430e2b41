//! Diesel ORM records for database tables.
//!
//! These provide compile-time type checking for database operations;
//! conversions into domain models live next to each repository.

use diesel::prelude::*;

use crate::schema;

/// Company record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::companies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CompanyRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
    pub created_at: String,
}

/// Source record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::sources)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SourceRecord {
    pub id: String,
    pub company_id: String,
    pub source_type: String,
    pub url: String,
    pub config: String,
    pub scrape_interval_minutes: i32,
    pub is_active: bool,
    pub health_status: String,
    pub consecutive_failures: i32,
    pub last_scraped_at: Option<String>,
    pub last_success_at: Option<String>,
    pub created_at: String,
}

/// Posting record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::postings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostingRecord {
    pub id: String,
    pub source_id: String,
    pub company_id: String,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_type: Option<String>,
    pub employment_type: Option<String>,
    pub seniority: Option<String>,
    pub apply_url: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub posted_at: Option<String>,
    pub discovered_at: String,
    pub is_active: bool,
    pub raw: String,
}

/// New posting for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::postings)]
pub struct NewPosting {
    pub id: String,
    pub source_id: String,
    pub company_id: String,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_type: Option<String>,
    pub employment_type: Option<String>,
    pub seniority: Option<String>,
    pub apply_url: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub posted_at: Option<String>,
    pub discovered_at: String,
    pub is_active: bool,
    pub raw: String,
}

/// Scrape attempt record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::scrape_attempts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScrapeAttemptRecord {
    pub id: i32,
    pub source_id: String,
    pub status: String,
    pub postings_found: i32,
    pub new_postings: i32,
    pub updated_postings: i32,
    pub duration_ms: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// New scrape attempt for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::scrape_attempts)]
pub struct NewScrapeAttempt<'a> {
    pub source_id: &'a str,
    pub status: &'a str,
    pub postings_found: i32,
    pub new_postings: i32,
    pub updated_postings: i32,
    pub duration_ms: Option<i32>,
    pub error_message: Option<&'a str>,
    pub created_at: &'a str,
}

/// User record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub push_token: Option<String>,
    pub preferences: String,
    pub created_at: String,
}

/// Notification record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::notification_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NotificationRecordRow {
    pub id: i32,
    pub user_id: String,
    pub posting_id: String,
    pub channel: String,
    pub notified_at: String,
    pub delivered: bool,
    pub is_read: bool,
    pub is_saved: bool,
    pub applied: bool,
}

/// New notification record for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::notification_records)]
pub struct NewNotificationRecord<'a> {
    pub user_id: &'a str,
    pub posting_id: &'a str,
    pub channel: &'a str,
    pub notified_at: &'a str,
    pub delivered: bool,
}
