//! User profile and notification preferences.
//!
//! Users are created and edited by the external API layer; the pipeline
//! only reads them to evaluate matches. Absence of a preference dimension
//! means no restriction on that dimension.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Preference profile evaluated against each new posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Master switch; disabled means no posting matches.
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    /// Company slug allow-list. Empty = any company.
    pub companies: Vec<String>,
    /// Role keywords matched against the posting title
    /// (underscores normalized to spaces). Empty = any role.
    pub roles: Vec<String>,
    /// Location substrings matched against the posting location;
    /// "remote" also matches any remote posting. Empty = anywhere.
    pub locations: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            push_enabled: true,
            companies: Vec::new(),
            roles: Vec::new(),
            locations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    /// Push destination token; users without one are not notifiable.
    pub push_token: Option<String>,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default_open_world() {
        let prefs: UserPreferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.push_enabled);
        assert!(prefs.companies.is_empty());
        assert!(prefs.roles.is_empty());
        assert!(prefs.locations.is_empty());
    }

    #[test]
    fn test_preferences_partial_json() {
        let prefs: UserPreferences =
            serde_json::from_str(r#"{"roles": ["backend_engineer"], "push_enabled": false}"#)
                .unwrap();
        assert!(!prefs.push_enabled);
        assert_eq!(prefs.roles, vec!["backend_engineer"]);
        assert!(prefs.locations.is_empty());
    }
}
