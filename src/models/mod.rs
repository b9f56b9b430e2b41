//! Data models for JobScout.

mod company;
mod notification;
mod posting;
mod scrape_attempt;
mod source;
mod user;

pub use company::Company;
pub use notification::{NotificationChannel, NotificationRecord};
pub use posting::{EmploymentType, LocationType, Posting, Seniority};
pub use scrape_attempt::{AttemptStatus, ScrapeAttempt};
pub use source::{HealthStatus, Source};
pub use user::{User, UserPreferences};
