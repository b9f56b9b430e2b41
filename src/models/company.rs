//! Company directory entry. Read-only to the pipeline; the matcher uses
//! the slug for preference checks and the push payload uses the name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// URL-safe identifier used in user company allow-lists.
    pub slug: String,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: String, slug: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            slug,
            website: None,
            created_at: Utc::now(),
        }
    }
}
