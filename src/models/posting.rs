//! Posting model and the canonical vocabulary enums.
//!
//! Postings are deduplicated by `(source_id, external_id)`. After first
//! sighting only the description may change; title, identifier, and
//! company are immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scrapers::NormalizedPosting;

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Remote,
    Hybrid,
    Onsite,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Hybrid => "hybrid",
            Self::Onsite => "onsite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remote" => Some(Self::Remote),
            "hybrid" => Some(Self::Hybrid),
            "onsite" => Some(Self::Onsite),
            _ => None,
        }
    }
}

/// Canonical employment-type vocabulary. Each strategy maps its source's
/// own vocabulary onto this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "full_time",
            Self::PartTime => "part_time",
            Self::Contract => "contract",
            Self::Internship => "internship",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full_time" => Some(Self::FullTime),
            "part_time" => Some(Self::PartTime),
            "contract" => Some(Self::Contract),
            "internship" => Some(Self::Internship),
            _ => None,
        }
    }
}

/// Seniority inferred from title keywords when the source has no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    Intern,
    Junior,
    Mid,
    Senior,
    Staff,
    Lead,
}

impl Seniority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intern => "intern",
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Staff => "staff",
            Self::Lead => "lead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "intern" => Some(Self::Intern),
            "junior" => Some(Self::Junior),
            "mid" => Some(Self::Mid),
            "senior" => Some(Self::Senior),
            "staff" => Some(Self::Staff),
            "lead" => Some(Self::Lead),
            _ => None,
        }
    }
}

/// A canonicalized job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: String,
    pub source_id: String,
    pub company_id: String,
    /// Identifier in the source's own namespace.
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
    pub discovered_at: DateTime<Utc>,
    pub is_active: bool,
    /// Normalized payload kept for audit.
    pub raw: serde_json::Value,
}

impl Posting {
    /// Build a posting from a normalized fetch result on first sighting.
    pub fn from_normalized(
        normalized: &NormalizedPosting,
        source_id: &str,
        company_id: &str,
        discovered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            company_id: company_id.to_string(),
            external_id: normalized.external_id.clone(),
            title: normalized.title.clone(),
            description: normalized.description.clone(),
            location: normalized.location.clone(),
            location_type: normalized.location_type,
            employment_type: normalized.employment_type,
            seniority: normalized.seniority,
            apply_url: normalized.apply_url.clone(),
            salary_min: normalized.salary_min,
            salary_max: normalized.salary_max,
            salary_currency: normalized.salary_currency.clone(),
            posted_at: normalized.posted_at,
            discovered_at,
            is_active: true,
            raw: normalized.raw.clone(),
        }
    }
}
