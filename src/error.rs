//! Error taxonomy for the scraping and notification pipeline.

use std::time::Duration;

/// Errors surfaced while running a scrape for one source.
///
/// Raw transport errors are summarized into these variants before anything
/// is persisted; the full error chain only ever reaches the tracing layer.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// No fetch strategy is registered under this source-type key.
    #[error("unknown source type: {0}")]
    UnknownSourceType(String),

    /// The source's config map is missing or has a malformed entry.
    #[error("invalid source config: {0}")]
    InvalidConfig(String),

    /// Network or protocol failure (transport error, non-2xx response).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The fetch exceeded its wall-clock budget.
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl ScrapeError {
    /// Short operator-facing summary persisted in the scrape attempt row.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    /// Configuration errors are not retryable without operator change.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ScrapeError::UnknownSourceType(_) | ScrapeError::InvalidConfig(_)
        )
    }
}

/// Push delivery failure for a single user. Isolated, never propagated
/// across users.
#[derive(Debug, thiserror::Error)]
#[error("push delivery failed: {0}")]
pub struct DeliveryError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_flagged() {
        assert!(ScrapeError::UnknownSourceType("indeed".into()).is_configuration());
        assert!(ScrapeError::InvalidConfig("missing board_slug".into()).is_configuration());
        assert!(!ScrapeError::Fetch("HTTP 503".into()).is_configuration());
        assert!(!ScrapeError::Timeout(Duration::from_secs(30)).is_configuration());
    }

    #[test]
    fn test_summary_is_short() {
        let err = ScrapeError::Fetch("HTTP 500".into());
        assert_eq!(err.summary(), "fetch failed: HTTP 500");
    }
}
