//! Greenhouse ATS board strategy.
//!
//! Greenhouse exposes a public JSON API per company board:
//! `GET https://boards-api.greenhouse.io/v1/boards/{slug}/jobs?content=true`.
//! The response nests location under `{"name": ...}`, ships descriptions
//! as HTML, and stamps `updated_at` as ISO-8601 with a UTC offset.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ScrapeError;
use crate::models::{EmploymentType, LocationType, Seniority};

use super::text::strip_html;
use super::{FetchStrategy, HttpClient, NormalizedPosting, SourceConfig};

const API_BASE: &str = "https://boards-api.greenhouse.io/v1/boards";

/// Fetch strategy for companies on Greenhouse.
///
/// Config:
/// - `board_slug` (required): the company's board slug, e.g. "twilio"
/// - `department_filter` (optional): keep only jobs in this department
pub struct GreenhouseStrategy;

#[async_trait]
impl FetchStrategy for GreenhouseStrategy {
    fn key(&self) -> &'static str {
        "greenhouse"
    }

    fn source_url(&self, config: &SourceConfig) -> Result<String, ScrapeError> {
        let slug = config.require_str("board_slug")?;
        Ok(format!("{API_BASE}/{slug}/jobs"))
    }

    async fn fetch(
        &self,
        client: &HttpClient,
        config: &SourceConfig,
    ) -> Result<Vec<NormalizedPosting>, ScrapeError> {
        let url = self.source_url(config)?;
        // content=true includes the full description HTML.
        let data = client
            .get_json(&url, &[("content", "true".to_string())])
            .await?;

        let dept_filter = config
            .get_str("department_filter")
            .map(|s| s.to_lowercase());

        let jobs = data
            .get("jobs")
            .and_then(|j| j.as_array())
            .cloned()
            .unwrap_or_default();

        let mut postings = Vec::new();
        for raw in &jobs {
            if let Some(filter) = &dept_filter {
                let departments: Vec<String> = raw
                    .get("departments")
                    .and_then(|d| d.as_array())
                    .map(|ds| {
                        ds.iter()
                            .filter_map(|d| d.get("name").and_then(|n| n.as_str()))
                            .map(|n| n.to_lowercase())
                            .collect()
                    })
                    .unwrap_or_default();
                if !departments.iter().any(|d| d.contains(filter)) {
                    continue;
                }
            }

            match map_job(raw) {
                Some(posting) => postings.push(posting),
                // A single unmappable record never fails the batch.
                None => tracing::debug!("dropped unmappable greenhouse record"),
            }
        }

        Ok(postings)
    }
}

/// Map one Greenhouse job object to the canonical shape.
fn map_job(raw: &serde_json::Value) -> Option<NormalizedPosting> {
    let external_id = match raw.get("id") {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return None,
    };
    let title = raw.get("title")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let location = raw
        .get("location")
        .and_then(|l| l.get("name"))
        .and_then(|n| n.as_str())
        .map(|s| s.to_string());

    let description = raw
        .get("content")
        .and_then(|c| c.as_str())
        .map(strip_html)
        .filter(|d| !d.is_empty());

    let apply_url = raw
        .get("absolute_url")
        .and_then(|u| u.as_str())
        .unwrap_or_default()
        .to_string();

    let posted_at = raw
        .get("updated_at")
        .and_then(|t| t.as_str())
        .and_then(parse_timestamp);

    let raw_audit = serde_json::json!({
        "departments": raw.get("departments").cloned().unwrap_or(serde_json::json!([])),
        "offices": raw.get("offices").cloned().unwrap_or(serde_json::json!([])),
    });

    Some(NormalizedPosting {
        location_type: Some(infer_location_type(location.as_deref().unwrap_or(""))),
        // Greenhouse has no dedicated employment-type field.
        employment_type: Some(EmploymentType::FullTime),
        seniority: Some(infer_seniority(&title)),
        description,
        location,
        posted_at,
        raw: raw_audit,
        ..NormalizedPosting::new(external_id, title, apply_url)
    })
}

/// Greenhouse has no location-type field; infer from the location name.
fn infer_location_type(location: &str) -> LocationType {
    let loc = location.to_lowercase();
    if loc.contains("remote") {
        LocationType::Remote
    } else if loc.contains("hybrid") {
        LocationType::Hybrid
    } else {
        LocationType::Onsite
    }
}

/// Title-keyword seniority table for Greenhouse boards.
fn infer_seniority(title: &str) -> Seniority {
    let t = title.to_lowercase();
    if t.contains("intern") {
        Seniority::Intern
    } else if t.contains("junior") || t.contains("entry") {
        Seniority::Junior
    } else if t.contains("senior") || t.contains("sr.") || t.contains("sr ") {
        Seniority::Senior
    } else if t.contains("staff") || t.contains("principal") || t.contains("distinguished") {
        Seniority::Staff
    } else if ["lead", "manager", "head of", "director", "vp"]
        .iter()
        .any(|w| t.contains(w))
    {
        Seniority::Lead
    } else {
        Seniority::Mid
    }
}

/// Parse an ISO-8601 timestamp with offset, e.g. `2024-01-15T12:00:00-05:00`.
fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
