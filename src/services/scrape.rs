//! Scrape orchestration for one source.
//!
//! The orchestrator owns everything a strategy must not: resolving the
//! strategy, the robots courtesy check, the fetch timeout, health
//! bookkeeping, and handing the batch to the transactional commit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::error::ScrapeError;
use crate::models::{AttemptStatus, Source};
use crate::repository::DbContext;
use crate::scrapers::{HttpClient, NormalizedPosting, ScraperRegistry, SourceConfig};

/// Outcome of asking the orchestrator to scrape one source.
#[derive(Debug, Clone)]
pub enum ScrapeOutcome {
    /// No source with that ID.
    NotFound,
    /// The source is disabled; nothing was attempted or recorded.
    Inactive,
    /// A run happened and was committed, successfully or not.
    Completed(RunSummary),
}

/// What one committed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub source_id: String,
    pub status: AttemptStatus,
    pub found: usize,
    pub new_posting_ids: Vec<String>,
    pub updated: usize,
    pub duration_ms: i32,
    pub error: Option<String>,
}

pub struct ScrapeService {
    ctx: DbContext,
    registry: Arc<ScraperRegistry>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ScrapeService {
    pub fn new(
        ctx: DbContext,
        registry: Arc<ScraperRegistry>,
        timeout: Duration,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            ctx,
            registry,
            timeout,
            user_agent,
        }
    }

    /// Run one scrape for one source and commit the outcome.
    ///
    /// Every run on an active source ends in exactly one committed
    /// attempt row; errors before the fetch (unknown strategy, bad
    /// config, robots block) count as failures like any other.
    pub async fn run_once(&self, source_id: &str) -> Result<ScrapeOutcome, anyhow::Error> {
        let Some(mut source) = self.ctx.sources().get(source_id).await? else {
            return Ok(ScrapeOutcome::NotFound);
        };
        if !source.is_active {
            tracing::debug!(source_id, "source inactive, skipping");
            return Ok(ScrapeOutcome::Inactive);
        }

        let started = Instant::now();
        tracing::info!(source_id, source_type = %source.source_type, "scrape starting");

        match self.fetch_batch(&source).await {
            Ok(batch) => {
                let duration_ms = started.elapsed().as_millis() as i32;
                let now = Utc::now();
                source.record_success(now);

                let counts = self
                    .ctx
                    .pipeline()
                    .commit_success(&source, &batch, duration_ms, now)
                    .await?;

                tracing::info!(
                    source_id,
                    found = counts.found,
                    new = counts.new_posting_ids.len(),
                    updated = counts.updated,
                    duration_ms,
                    "scrape succeeded"
                );
                Ok(ScrapeOutcome::Completed(RunSummary {
                    source_id: source.id,
                    status: AttemptStatus::Success,
                    found: counts.found,
                    new_posting_ids: counts.new_posting_ids,
                    updated: counts.updated,
                    duration_ms,
                    error: None,
                }))
            }
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as i32;
                let now = Utc::now();
                source.record_failure(now);

                let summary = err.summary();
                self.ctx
                    .pipeline()
                    .commit_failure(&source, AttemptStatus::Failed, &summary, duration_ms, now)
                    .await?;

                tracing::warn!(
                    source_id,
                    error = %summary,
                    failures = source.consecutive_failures,
                    health = source.health_status.as_str(),
                    "scrape failed"
                );
                Ok(ScrapeOutcome::Completed(RunSummary {
                    source_id: source.id,
                    status: AttemptStatus::Failed,
                    found: 0,
                    new_posting_ids: Vec::new(),
                    updated: 0,
                    duration_ms,
                    error: Some(summary),
                }))
            }
        }
    }

    /// Resolve the strategy and fetch one batch within the wall-clock
    /// budget.
    async fn fetch_batch(&self, source: &Source) -> Result<Vec<NormalizedPosting>, ScrapeError> {
        let strategy = self.registry.resolve(&source.source_type)?;
        let config = build_config(source);

        let user_agent = config
            .get_str("user_agent")
            .map(String::from)
            .or_else(|| self.user_agent.clone());
        let client = HttpClient::new(self.timeout, user_agent.as_deref())?;

        let endpoint = strategy.source_url(&config)?;
        if !client.robots_allows(&endpoint).await {
            return Err(ScrapeError::Fetch("blocked by robots.txt".to_string()));
        }

        match tokio::time::timeout(self.timeout, strategy.fetch(&client, &config)).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout(self.timeout)),
        }
    }
}

/// Strategy config is the source's config map with the source URL
/// injected, so URL-driven strategies need no duplicate entry.
fn build_config(source: &Source) -> SourceConfig {
    let mut map = source.config.clone();
    map.entry("url".to_string())
        .or_insert_with(|| serde_json::Value::String(source.url.clone()));
    SourceConfig::new(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_injects_url() {
        let source = Source::new(
            "c1".into(),
            "careers_page".into(),
            "https://example.com/careers".into(),
        );
        let config = build_config(&source);
        assert_eq!(config.get_str("url"), Some("https://example.com/careers"));
    }

    #[test]
    fn test_build_config_keeps_explicit_url() {
        let mut source = Source::new("c1".into(), "careers_page".into(), "https://a.test".into());
        source.config.insert(
            "url".to_string(),
            serde_json::Value::String("https://b.test".to_string()),
        );
        let config = build_config(&source);
        assert_eq!(config.get_str("url"), Some("https://b.test"));
    }
}
