//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! over SQLite via diesel-async's SyncConnectionWrapper.

pub mod context;
pub mod migrations;
pub mod models;
pub mod pool;

// Repositories
pub mod attempt;
pub mod company;
pub mod notification;
pub mod pipeline;
pub mod posting;
pub mod source;
pub mod user;

pub use attempt::AttemptRepository;
pub use company::CompanyRepository;
pub use context::DbContext;
pub use notification::NotificationRepository;
pub use pipeline::{PipelineRepository, RunCounts};
pub use pool::{AsyncSqliteConnection, AsyncSqlitePool, DieselError};
pub use posting::PostingRepository;
pub use source::SourceRepository;
pub use user::UserRepository;

pub use models::{
    CompanyRecord, NewNotificationRecord, NewPosting, NewScrapeAttempt, NotificationRecordRow,
    PostingRecord, ScrapeAttemptRecord, SourceRecord, UserRecord,
};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
