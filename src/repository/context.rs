//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection factory and hands out repositories.

use std::path::Path;

use super::attempt::AttemptRepository;
use super::company::CompanyRepository;
use super::notification::NotificationRepository;
use super::pipeline::PipelineRepository;
use super::pool::{AsyncSqlitePool, DieselError};
use super::posting::PostingRepository;
use super::source::SourceRepository;
use super::user::UserRepository;

/// Database context that owns the pool and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_path(&data_dir.join("jobscout.db"));
/// let sources = ctx.sources().get_all().await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn from_path(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    /// Create a context from a database URL (`sqlite:` prefix optional).
    pub fn from_url(url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    /// Run pending schema migrations.
    pub async fn run_migrations(&self) -> Result<(), DieselError> {
        super::migrations::run_migrations(self.pool.database_url()).await
    }

    /// Get a source repository.
    pub fn sources(&self) -> SourceRepository {
        SourceRepository::new(self.pool.clone())
    }

    /// Get a company repository.
    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository::new(self.pool.clone())
    }

    /// Get a posting repository.
    pub fn postings(&self) -> PostingRepository {
        PostingRepository::new(self.pool.clone())
    }

    /// Get a scrape attempt repository.
    pub fn attempts(&self) -> AttemptRepository {
        AttemptRepository::new(self.pool.clone())
    }

    /// Get a user repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Get a notification record repository.
    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    /// Get the transactional run-commit repository.
    pub fn pipeline(&self) -> PipelineRepository {
        PipelineRepository::new(self.pool.clone())
    }
}
