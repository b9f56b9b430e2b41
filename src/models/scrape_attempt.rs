//! Scrape attempt audit record. Append-only, exactly one per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Partial,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Audit trail entry for one scrape of one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeAttempt {
    pub id: i32,
    pub source_id: String,
    pub status: AttemptStatus,
    pub postings_found: i32,
    pub new_postings: i32,
    pub updated_postings: i32,
    pub duration_ms: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}
