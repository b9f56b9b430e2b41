//! Remotive aggregator strategy.
//!
//! Remotive is an aggregator, not an ATS: one source yields postings
//! from many companies, all remote by definition. It is also the only
//! built-in source that exposes salary strings.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::ScrapeError;
use crate::models::{EmploymentType, LocationType, Seniority};

use super::text::strip_html;
use super::{FetchStrategy, HttpClient, NormalizedPosting, SourceConfig};

const API_URL: &str = "https://remotive.com/api/remote-jobs";
const DEFAULT_CATEGORY: &str = "software-dev";
const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 100;

/// Fetch strategy for the Remotive remote-jobs API.
///
/// Config (all optional):
/// - `category`: job category filter (default "software-dev")
/// - `limit`: max postings per fetch (default 50, capped at 100)
/// - `search`: free-text search filter
pub struct RemotiveStrategy;

#[async_trait]
impl FetchStrategy for RemotiveStrategy {
    fn key(&self) -> &'static str {
        "remotive"
    }

    fn source_url(&self, _config: &SourceConfig) -> Result<String, ScrapeError> {
        Ok(API_URL.to_string())
    }

    async fn fetch(
        &self,
        client: &HttpClient,
        config: &SourceConfig,
    ) -> Result<Vec<NormalizedPosting>, ScrapeError> {
        let category = config.get_str("category").unwrap_or(DEFAULT_CATEGORY);
        let limit = config.get_u64("limit").unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

        let mut params = vec![
            ("category", category.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(search) = config.get_str("search") {
            params.push(("search", search.to_string()));
        }

        let data = client.get_json(API_URL, &params).await?;

        let jobs = data
            .get("jobs")
            .and_then(|j| j.as_array())
            .cloned()
            .unwrap_or_default();

        let mut postings = Vec::new();
        for raw in &jobs {
            match map_job(raw) {
                Some(posting) => postings.push(posting),
                None => tracing::debug!("dropped unmappable remotive record"),
            }
        }
        Ok(postings)
    }
}

/// Map one Remotive job to the canonical shape.
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

    // "candidate_required_location": values like "Worldwide", "USA Only".
    let location = raw
        .get("candidate_required_location")
        .and_then(|l| l.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Remote")
        .to_string();

    let description = raw
        .get("description")
        .and_then(|d| d.as_str())
        .map(strip_html)
        .filter(|d| !d.is_empty());

    let (salary_min, salary_max, salary_currency) =
        parse_salary(raw.get("salary").and_then(|s| s.as_str()).unwrap_or(""));

    let posted_at = raw
        .get("publication_date")
        .and_then(|d| d.as_str())
        .and_then(parse_date);

    let raw_audit = serde_json::json!({
        "company_name": raw.get("company_name").cloned().unwrap_or(serde_json::Value::Null),
        "category": raw.get("category").cloned().unwrap_or(serde_json::Value::Null),
        "tags": raw.get("tags").cloned().unwrap_or(serde_json::json!([])),
    });

    Some(NormalizedPosting {
        // An aggregator of remote-only listings.
        location_type: Some(LocationType::Remote),
        employment_type: Some(map_job_type(
            raw.get("job_type").and_then(|t| t.as_str()).unwrap_or(""),
        )),
        seniority: Some(infer_seniority(&title)),
        description,
        location: Some(location),
        salary_min,
        salary_max,
        salary_currency,
        posted_at,
        raw: raw_audit,
        ..NormalizedPosting::new(
            external_id,
            title,
            raw.get("url")
                .and_then(|u| u.as_str())
                .unwrap_or_default()
                .to_string(),
        )
    })
}

/// Remotive job_type vocabulary: full_time, part_time, contract,
/// freelance, internship, other.
fn map_job_type(job_type: &str) -> EmploymentType {
    let jt = job_type.to_lowercase().replace(['-', ' '], "_");
    if jt.contains("part") {
        EmploymentType::PartTime
    } else if jt.contains("contract") || jt.contains("freelance") {
        EmploymentType::Contract
    } else if jt.contains("intern") {
        EmploymentType::Internship
    } else {
        EmploymentType::FullTime
    }
}

/// Title-keyword seniority table for Remotive listings.
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

fn salary_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\d,]+").expect("valid regex"))
}

/// Parse salary strings like "$80,000 - $120,000" into (min, max, currency).
fn parse_salary(salary: &str) -> (Option<i64>, Option<i64>, Option<String>) {
    if salary.is_empty() {
        return (None, None, None);
    }

    let upper = salary.to_uppercase();
    let currency = if salary.contains('€') || upper.contains("EUR") {
        "EUR"
    } else if salary.contains('£') || upper.contains("GBP") {
        "GBP"
    } else if upper.contains("KES") || salary.contains("KSh") {
        "KES"
    } else {
        "USD"
    };

    let numbers: Vec<i64> = salary_number_re()
        .find_iter(salary)
        .filter_map(|m| m.as_str().replace(',', "").parse().ok())
        .collect();

    match numbers.as_slice() {
        [] => (None, None, None),
        [single] => (Some(*single), Some(*single), Some(currency.to_string())),
        many => (
            many.iter().min().copied(),
            many.iter().max().copied(),
            Some(currency.to_string()),
        ),
    }
}

/// Remotive timestamps are naive ISO ("2024-01-15T00:00:00"), treated
/// as UTC.
fn parse_date(date: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
