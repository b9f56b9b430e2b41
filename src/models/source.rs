//! Source model and the per-source health state machine.
//!
//! A source is one configured external endpoint (a company's ATS board,
//! a careers page, or an aggregator feed). The pipeline mutates health
//! fields after every scrape attempt; everything else is operator-owned.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Consecutive failures at which a source is marked failing and disabled.
pub const FAILING_THRESHOLD: i32 = 3;

/// Health of a source, degraded automatically on repeated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Degraded,
    Failing,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Failing => "failing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Self::Unknown),
            "healthy" => Some(Self::Healthy),
            "degraded" => Some(Self::Degraded),
            "failing" => Some(Self::Failing),
            _ => None,
        }
    }
}

/// A configured scrape target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub company_id: String,
    /// Strategy key resolved through the scraper registry.
    pub source_type: String,
    pub url: String,
    /// Strategy-specific configuration (opaque to the orchestrator).
    pub config: serde_json::Map<String, serde_json::Value>,
    pub scrape_interval_minutes: i32,
    pub is_active: bool,
    pub health_status: HealthStatus,
    pub consecutive_failures: i32,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Create a new source with default health.
    pub fn new(company_id: String, source_type: String, url: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            company_id,
            source_type,
            url,
            config: serde_json::Map::new(),
            scrape_interval_minutes: 30,
            is_active: true,
            health_status: HealthStatus::Unknown,
            consecutive_failures: 0,
            last_scraped_at: None,
            last_success_at: None,
            created_at: Utc::now(),
        }
    }

    /// Record a successful scrape: healthy, counter reset, both stamps set.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_scraped_at = Some(now);
        self.last_success_at = Some(now);
        self.consecutive_failures = 0;
        self.health_status = HealthStatus::Healthy;
    }

    /// Record a failed scrape. Counter 1-2 degrades the source; at the
    /// failing threshold the source is also deactivated.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.last_scraped_at = Some(now);
        self.consecutive_failures += 1;

        if self.consecutive_failures >= FAILING_THRESHOLD {
            self.health_status = HealthStatus::Failing;
            self.is_active = false;
        } else {
            self.health_status = HealthStatus::Degraded;
        }
    }

    /// Operator re-activation: back to unknown with a clean slate.
    /// The pipeline never calls this on its own.
    pub fn reset_health(&mut self) {
        self.health_status = HealthStatus::Unknown;
        self.consecutive_failures = 0;
        self.is_active = true;
    }

    /// Whether this source is due for a scrape at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.last_scraped_at {
            None => true,
            Some(last) => now - last >= Duration::minutes(self.scrape_interval_minutes as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Source {
        Source::new("c1".into(), "greenhouse".into(), "https://example.com".into())
    }

    #[test]
    fn test_failure_transitions() {
        let mut s = source();
        let now = Utc::now();

        s.record_failure(now);
        assert_eq!(s.health_status, HealthStatus::Degraded);
        assert_eq!(s.consecutive_failures, 1);
        assert!(s.is_active);

        s.record_failure(now);
        assert_eq!(s.health_status, HealthStatus::Degraded);
        assert_eq!(s.consecutive_failures, 2);
        assert!(s.is_active);

        s.record_failure(now);
        assert_eq!(s.health_status, HealthStatus::Failing);
        assert_eq!(s.consecutive_failures, 3);
        assert!(!s.is_active);
    }

    #[test]
    fn test_success_resets_counter() {
        let mut s = source();
        let now = Utc::now();

        s.record_failure(now);
        s.record_failure(now);
        s.record_success(now);

        assert_eq!(s.health_status, HealthStatus::Healthy);
        assert_eq!(s.consecutive_failures, 0);
        assert_eq!(s.last_scraped_at, Some(now));
        assert_eq!(s.last_success_at, Some(now));
    }

    #[test]
    fn test_reset_health_reactivates() {
        let mut s = source();
        let now = Utc::now();
        for _ in 0..3 {
            s.record_failure(now);
        }
        assert!(!s.is_active);

        s.reset_health();
        assert!(s.is_active);
        assert_eq!(s.health_status, HealthStatus::Unknown);
        assert_eq!(s.consecutive_failures, 0);
    }

    #[test]
    fn test_due_check() {
        let mut s = source();
        let now = Utc::now();
        s.scrape_interval_minutes = 30;

        // Never scraped: due.
        assert!(s.is_due(now));

        s.last_scraped_at = Some(now - Duration::minutes(45));
        assert!(s.is_due(now));

        s.last_scraped_at = Some(now - Duration::minutes(10));
        assert!(!s.is_due(now));

        s.last_scraped_at = Some(now - Duration::minutes(45));
        s.is_active = false;
        assert!(!s.is_due(now));
    }
}
