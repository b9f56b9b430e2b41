//! Lever ATS board strategy.
//!
//! Lever's postings API differs from Greenhouse in every way that
//! matters here: the response is a flat array, timestamps are epoch
//! milliseconds, there is a dedicated `workplaceType` field, and the
//! `categories` object carries location/commitment/team.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ScrapeError;
use crate::models::{EmploymentType, LocationType, Seniority};

use super::text::strip_html;
use super::{FetchStrategy, HttpClient, NormalizedPosting, SourceConfig};

const API_BASE: &str = "https://api.lever.co/v0/postings";

/// Fetch strategy for companies on Lever.
///
/// Config:
/// - `company_slug` (required): the company's Lever slug, e.g. "netflix"
/// - `team_filter` (optional): keep only postings from this team
/// - `location_filter` (optional): keep only postings matching this location
pub struct LeverStrategy;

#[async_trait]
impl FetchStrategy for LeverStrategy {
    fn key(&self) -> &'static str {
        "lever"
    }

    fn source_url(&self, config: &SourceConfig) -> Result<String, ScrapeError> {
        let slug = config.require_str("company_slug")?;
        Ok(format!("{API_BASE}/{slug}"))
    }

    async fn fetch(
        &self,
        client: &HttpClient,
        config: &SourceConfig,
    ) -> Result<Vec<NormalizedPosting>, ScrapeError> {
        let url = self.source_url(config)?;
        // mode=json: Lever otherwise returns its embed format.
        let data = client
            .get_json(&url, &[("mode", "json".to_string())])
            .await?;

        // Flat array, not wrapped in an object.
        let Some(raw_postings) = data.as_array() else {
            return Ok(Vec::new());
        };

        let team_filter = config.get_str("team_filter").map(|s| s.to_lowercase());
        let location_filter = config.get_str("location_filter").map(|s| s.to_lowercase());

        let mut postings = Vec::new();
        for raw in raw_postings {
            let categories = raw.get("categories").cloned().unwrap_or_default();

            if let Some(filter) = &team_filter {
                let team = categories
                    .get("team")
                    .and_then(|t| t.as_str())
                    .unwrap_or("")
                    .to_lowercase();
                if !team.contains(filter) {
                    continue;
                }
            }
            if let Some(filter) = &location_filter {
                let loc = categories
                    .get("location")
                    .and_then(|l| l.as_str())
                    .unwrap_or("")
                    .to_lowercase();
                if !loc.contains(filter) {
                    continue;
                }
            }

            match map_posting(raw) {
                Some(posting) => postings.push(posting),
                None => tracing::debug!("dropped unmappable lever record"),
            }
        }

        Ok(postings)
    }
}

/// Map one Lever posting to the canonical shape.
fn map_posting(raw: &serde_json::Value) -> Option<NormalizedPosting> {
    let external_id = raw.get("id")?.as_str()?.to_string();
    if external_id.is_empty() {
        return None;
    }
    let title = raw.get("text")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let categories = raw.get("categories").cloned().unwrap_or_default();
    let location = categories
        .get("location")
        .and_then(|l| l.as_str())
        .map(|s| s.to_string());

    let workplace_type = raw
        .get("workplaceType")
        .and_then(|w| w.as_str())
        .unwrap_or("");
    let commitment = categories
        .get("commitment")
        .and_then(|c| c.as_str())
        .unwrap_or("");

    // Prefer the plain-text description when Lever provides it.
    let mut description = raw
        .get("descriptionPlain")
        .and_then(|d| d.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            strip_html(raw.get("description").and_then(|d| d.as_str()).unwrap_or(""))
        });

    // Append list sections (Requirements, Qualifications, ...).
    if let Some(lists) = raw.get("lists").and_then(|l| l.as_array()) {
        for section in lists {
            let heading = section.get("text").and_then(|t| t.as_str()).unwrap_or("");
            let content = strip_html(section.get("content").and_then(|c| c.as_str()).unwrap_or(""));
            if !content.is_empty() {
                description.push_str(&format!("\n\n{heading}:\n{content}"));
            }
        }
    }
    let description = {
        let trimmed = description.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    let apply_url = raw
        .get("applyUrl")
        .or_else(|| raw.get("hostedUrl"))
        .and_then(|u| u.as_str())
        .unwrap_or_default()
        .to_string();

    // createdAt is epoch MILLISECONDS.
    let posted_at = raw
        .get("createdAt")
        .and_then(|t| t.as_i64())
        .and_then(parse_epoch_ms);

    let raw_audit = serde_json::json!({
        "team": categories.get("team").cloned().unwrap_or(serde_json::Value::Null),
        "department": categories.get("department").cloned().unwrap_or(serde_json::Value::Null),
        "commitment": commitment,
        "workplace_type": workplace_type,
    });

    Some(NormalizedPosting {
        location_type: Some(map_workplace_type(
            workplace_type,
            location.as_deref().unwrap_or(""),
        )),
        employment_type: Some(map_commitment(commitment)),
        seniority: Some(infer_seniority(&title)),
        description,
        location,
        posted_at,
        raw: raw_audit,
        ..NormalizedPosting::new(external_id, title, apply_url)
    })
}

/// Lever's `workplaceType` maps directly; empty falls back to the
/// location string.
fn map_workplace_type(workplace_type: &str, location: &str) -> LocationType {
    match workplace_type.to_lowercase().as_str() {
        "remote" => LocationType::Remote,
        "hybrid" => LocationType::Hybrid,
        "onsite" | "on-site" => LocationType::Onsite,
        _ => {
            if location.to_lowercase().contains("remote") {
                LocationType::Remote
            } else {
                LocationType::Onsite
            }
        }
    }
}

/// Lever commitment vocabulary: "Full-time", "Part-time", "Contract",
/// "Intern", and variants.
fn map_commitment(commitment: &str) -> EmploymentType {
    let c = commitment.to_lowercase();
    if c.contains("part") {
        EmploymentType::PartTime
    } else if c.contains("contract") || c.contains("freelance") {
        EmploymentType::Contract
    } else if c.contains("intern") {
        EmploymentType::Internship
    } else {
        EmploymentType::FullTime
    }
}

/// Title-keyword seniority table for Lever boards.
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

/// Epoch milliseconds to UTC instant.
fn parse_epoch_ms(epoch_ms: i64) -> Option<DateTime<Utc>> {
    if epoch_ms <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(epoch_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_posting() -> serde_json::Value {
        serde_json::json!({
            "id": "abc123-def456",
            "text": "Backend Engineer",
            "hostedUrl": "https://jobs.lever.co/acme/abc123",
            "applyUrl": "https://jobs.lever.co/acme/abc123/apply",
            "categories": {
                "location": "Nairobi, Kenya",
                "commitment": "Full-time",
                "team": "Engineering"
            },
            "descriptionPlain": "We are looking for an engineer.",
            "lists": [
                {"text": "Requirements", "content": "<li>5+ years</li>"}
            ],
            "createdAt": 1705305600000i64,
            "workplaceType": "remote"
        })
    }

    #[test]
    fn test_map_posting_full() {
        let posting = map_posting(&sample_posting()).unwrap();
        assert_eq!(posting.external_id, "abc123-def456");
        assert_eq!(posting.location_type, Some(LocationType::Remote));
        assert_eq!(posting.employment_type, Some(EmploymentType::FullTime));
        assert_eq!(
            posting.apply_url,
            "https://jobs.lever.co/acme/abc123/apply"
        );
        let desc = posting.description.unwrap();
        assert!(desc.starts_with("We are looking for an engineer."));
        assert!(desc.contains("Requirements:\n5+ years"));
        assert_eq!(
            posting.posted_at.unwrap(),
            DateTime::from_timestamp_millis(1705305600000).unwrap()
        );
    }

    #[test]
    fn test_workplace_type_fallback() {
        assert_eq!(map_workplace_type("", "Remote - EMEA"), LocationType::Remote);
        assert_eq!(map_workplace_type("", "Berlin"), LocationType::Onsite);
        assert_eq!(map_workplace_type("hybrid", "Berlin"), LocationType::Hybrid);
    }

    #[test]
    fn test_commitment_vocabulary() {
        assert_eq!(map_commitment("Part-time"), EmploymentType::PartTime);
        assert_eq!(map_commitment("Contract"), EmploymentType::Contract);
        assert_eq!(map_commitment("Intern"), EmploymentType::Internship);
        assert_eq!(map_commitment("Full-time"), EmploymentType::FullTime);
        assert_eq!(map_commitment(""), EmploymentType::FullTime);
    }

    #[test]
    fn test_drops_record_without_id() {
        let mut raw = sample_posting();
        raw.as_object_mut().unwrap().remove("id");
        assert!(map_posting(&raw).is_none());
    }

    #[test]
    fn test_epoch_ms_bounds() {
        assert!(parse_epoch_ms(0).is_none());
        assert!(parse_epoch_ms(-5).is_none());
        assert!(parse_epoch_ms(1705305600000).is_some());
    }
}
