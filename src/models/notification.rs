//! Notification delivery record.
//!
//! One row per `(user, posting)` pair, created before any send is
//! attempted. The uniqueness constraint on that pair is what guarantees
//! at-most-once dispatch under retries and concurrency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Push,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "push" => Some(Self::Push),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i32,
    pub user_id: String,
    pub posting_id: String,
    pub channel: NotificationChannel,
    pub notified_at: DateTime<Utc>,
    pub delivered: bool,
    // Engagement flags are written by the external API layer, never here.
    pub is_read: bool,
    pub is_saved: bool,
    pub applied: bool,
}
