//! Service layer for JobScout business logic.
//!
//! Domain logic separated from UI concerns. Services are used by the
//! CLI and by the long-running scheduler.

pub mod notify;
pub mod push;
pub mod scheduler;
pub mod scrape;

pub use notify::{preferences_match, DispatchSummary, NotificationService};
pub use push::{NullPushSender, PushMessage, PushSender, WebhookPushSender};
pub use scheduler::{Scheduler, SchedulerConfig, TickSummary, WorkItem};
pub use scrape::{RunSummary, ScrapeOutcome, ScrapeService};
