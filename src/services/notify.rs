//! Notification matching and dispatch.
//!
//! Matching is a pure preference predicate; dispatch claims the
//! `(user, posting)` pair before sending so retries and concurrent
//! dispatches for the same posting cannot double-notify anyone.

use std::sync::Arc;

use chrono::Utc;

use crate::models::{
    Company, LocationType, NotificationChannel, Posting, User, UserPreferences,
};
use crate::repository::DbContext;

use super::push::{PushMessage, PushSender};

/// Outcome of dispatching one posting to the notifiable user base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Users whose preferences matched the posting.
    pub matched: usize,
    /// Deliveries confirmed by the push backend.
    pub sent: usize,
}

pub struct NotificationService {
    ctx: DbContext,
    sender: Arc<dyn PushSender>,
}

impl NotificationService {
    pub fn new(ctx: DbContext, sender: Arc<dyn PushSender>) -> Self {
        Self { ctx, sender }
    }

    /// Evaluate every notifiable user against one posting and deliver to
    /// the matches. Per-user delivery failures are isolated: the claim
    /// stays recorded as undelivered and other users are unaffected.
    pub async fn dispatch_for_posting(
        &self,
        posting_id: &str,
    ) -> Result<DispatchSummary, anyhow::Error> {
        let Some((posting, company)) = self.ctx.postings().get_with_company(posting_id).await?
        else {
            tracing::warn!(posting_id, "posting vanished before dispatch");
            return Ok(DispatchSummary::default());
        };

        let users = self.ctx.users().notifiable().await?;
        let notifications = self.ctx.notifications();
        let mut summary = DispatchSummary::default();

        for user in &users {
            if !preferences_match(&user.preferences, &posting, &company.slug) {
                continue;
            }
            summary.matched += 1;

            let claimed = notifications
                .try_claim(&user.id, &posting.id, NotificationChannel::Push, Utc::now())
                .await?;
            if !claimed {
                tracing::debug!(user_id = %user.id, posting_id, "already notified, skipping");
                continue;
            }

            let message = render_message(user, &posting, &company);
            match self.sender.send(&message).await {
                Ok(()) => {
                    notifications.mark_delivered(&user.id, &posting.id).await?;
                    summary.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(user_id = %user.id, posting_id, error = %e, "push delivery failed");
                }
            }
        }

        tracing::info!(
            posting_id,
            matched = summary.matched,
            sent = summary.sent,
            "notification dispatch finished"
        );
        Ok(summary)
    }
}

fn render_message(user: &User, posting: &Posting, company: &Company) -> PushMessage {
    PushMessage {
        // notifiable() guarantees a token is present.
        token: user.push_token.clone().unwrap_or_default(),
        title: posting.title.clone(),
        company: company.name.clone(),
        location: posting.location.clone(),
        posting_id: posting.id.clone(),
    }
}

/// Open-world preference predicate: an empty dimension restricts nothing,
/// all configured dimensions must agree.
pub fn preferences_match(prefs: &UserPreferences, posting: &Posting, company_slug: &str) -> bool {
    if !prefs.push_enabled {
        return false;
    }

    if !prefs.companies.is_empty() {
        let slug = company_slug.to_lowercase();
        if !prefs.companies.iter().any(|c| c.to_lowercase() == slug) {
            return false;
        }
    }

    if !prefs.roles.is_empty() {
        let title = posting.title.to_lowercase();
        // Role keywords are stored underscore-separated ("backend_engineer").
        let matches_role = prefs
            .roles
            .iter()
            .map(|r| r.to_lowercase().replace('_', " "))
            .any(|r| title.contains(&r));
        if !matches_role {
            return false;
        }
    }

    if !prefs.locations.is_empty() {
        let location = posting
            .location
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let is_remote = posting.location_type == Some(LocationType::Remote);

        let matches_location = prefs.locations.iter().map(|l| l.to_lowercase()).any(|l| {
            // "remote" matches any remote posting regardless of its
            // location text.
            (l == "remote" && is_remote) || (!location.is_empty() && location.contains(&l))
        });
        if !matches_location {
            return false;
        }
    }

    true
}
