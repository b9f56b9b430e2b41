//! Fetch strategies for external job boards.
//!
//! One strategy per source type. Each strategy performs a single bounded
//! fetch and maps the external schema into [`NormalizedPosting`]s; retries
//! and health bookkeeping belong to the orchestrator, never here.

mod careers;
mod greenhouse;
mod http_client;
mod lever;
mod registry;
mod remotive;
pub mod text;

pub use careers::CareersPageStrategy;
pub use greenhouse::GreenhouseStrategy;
pub use http_client::{HttpClient, USER_AGENT};
pub use lever::LeverStrategy;
pub use registry::ScraperRegistry;
pub use remotive::RemotiveStrategy;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ScrapeError;
use crate::models::{EmploymentType, LocationType, Seniority};

/// Strategy-specific configuration, stored as an opaque JSON map on the
/// source. Typed accessors keep the strategies honest about what they need.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    map: serde_json::Map<String, serde_json::Value>,
}

impl SourceConfig {
    pub fn new(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { map }
    }

    /// A string value, if present and non-empty.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// A required string value; missing means the config is malformed.
    pub fn require_str(&self, key: &str) -> Result<&str, ScrapeError> {
        self.get_str(key)
            .ok_or_else(|| ScrapeError::InvalidConfig(format!("missing '{key}'")))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(|v| v.as_u64())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for SourceConfig {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::new(map)
    }
}

/// A job posting mapped into the canonical shape, before persistence.
#[derive(Debug, Clone)]
pub struct NormalizedPosting {
    /// Identifier in the source's namespace. Dedup key with the source id.
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_type: Option<LocationType>,
    pub employment_type: Option<EmploymentType>,
    pub seniority: Option<Seniority>,
    pub apply_url: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    /// Source-specific leftovers kept for audit.
    pub raw: serde_json::Value,
}

impl NormalizedPosting {
    /// Create a minimal posting; optional fields via struct update.
    pub fn new(external_id: String, title: String, apply_url: String) -> Self {
        Self {
            external_id,
            title,
            description: None,
            location: None,
            location_type: None,
            employment_type: None,
            seniority: None,
            apply_url,
            salary_min: None,
            salary_max: None,
            salary_currency: None,
            posted_at: None,
            raw: serde_json::json!({}),
        }
    }
}

/// Per-source-type fetch and normalization logic.
///
/// `fetch` makes one network round trip (or a small bounded number) and
/// must not retry internally. Records missing a title or identifier are
/// dropped individually, never failing the whole batch.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Registry key for this strategy.
    fn key(&self) -> &'static str;

    /// Canonical endpoint queried, used for audit and the robots check.
    fn source_url(&self, config: &SourceConfig) -> Result<String, ScrapeError>;

    /// Fetch and normalize one batch of postings.
    async fn fetch(
        &self,
        client: &HttpClient,
        config: &SourceConfig,
    ) -> Result<Vec<NormalizedPosting>, ScrapeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_accessors() {
        let map = serde_json::json!({"board_slug": "acme", "limit": 25, "empty": ""});
        let config = SourceConfig::new(map.as_object().unwrap().clone());

        assert_eq!(config.get_str("board_slug"), Some("acme"));
        assert_eq!(config.get_str("empty"), None);
        assert_eq!(config.get_u64("limit"), Some(25));
        assert!(config.require_str("missing").is_err());
    }
}
