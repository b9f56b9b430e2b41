//! HTTP client shared by the fetch strategies.
//!
//! Thin wrapper over reqwest that owns user-agent resolution, the
//! per-request timeout, and the mapping of transport failures into the
//! pipeline error taxonomy. Also hosts the courtesy robots.txt check.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::ScrapeError;

/// Default identifying user agent.
pub const USER_AGENT: &str = "JobScout/0.1 (job discovery; +https://github.com/jobscout)";

/// Real browser user agents for rotate mode.
const ROTATING_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

/// Pick a rotating user agent without pulling in a RNG.
fn rotating_user_agent() -> &'static str {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as usize)
        .unwrap_or(0);
    ROTATING_USER_AGENTS[nanos % ROTATING_USER_AGENTS.len()]
}

/// Resolve user agent from config value.
/// - None => default JobScout user agent
/// - Some("rotate") => random real browser user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some("rotate") => rotating_user_agent().to_string(),
        Some(custom) => custom.to_string(),
    }
}

/// HTTP client with timeout and error normalization.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new client. `user_agent_config` follows
    /// [`resolve_user_agent`] semantics.
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent_config))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ScrapeError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self { client, timeout })
    }

    /// GET a JSON document.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, ScrapeError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.normalize(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch(format!("HTTP {}", status.as_u16())));
        }

        response.json().await.map_err(|e| self.normalize(e))
    }

    /// GET an HTML/text document.
    pub async fn get_text(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.normalize(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch(format!("HTTP {}", status.as_u16())));
        }

        response.text().await.map_err(|e| self.normalize(e))
    }

    /// Courtesy robots.txt check for the host of `url`.
    ///
    /// Deliberately permissive: missing robots.txt or any error means
    /// allowed. Only a blanket `Disallow: /` under `User-agent: *` blocks.
    pub async fn robots_allows(&self, url: &str) -> bool {
        let robots_url = match Url::parse(url) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => format!("{}://{}/robots.txt", parsed.scheme(), host),
                None => return true,
            },
            Err(_) => return true,
        };

        let response = match self.client.get(&robots_url).send().await {
            Ok(r) => r,
            Err(_) => return true,
        };
        if !response.status().is_success() {
            return true;
        }
        let body = match response.text().await {
            Ok(t) => t.to_lowercase(),
            Err(_) => return true,
        };

        !robots_blocks_everything(&body)
    }

    /// Map a reqwest error to the pipeline taxonomy. Timeouts are their
    /// own variant so the orchestrator can report the budget.
    fn normalize(&self, err: reqwest::Error) -> ScrapeError {
        if err.is_timeout() {
            ScrapeError::Timeout(self.timeout)
        } else {
            // Keep the summary terse; the full chain goes to tracing only.
            tracing::debug!("transport error: {err:?}");
            ScrapeError::Fetch(err.without_url().to_string())
        }
    }
}

/// True when robots.txt disallows everything for all agents.
fn robots_blocks_everything(body: &str) -> bool {
    let mut wildcard_section = false;
    for line in body.lines() {
        let line = line.trim();
        if let Some(agent) = line.strip_prefix("user-agent:") {
            wildcard_section = agent.trim() == "*";
        } else if wildcard_section {
            if let Some(path) = line.strip_prefix("disallow:") {
                if path.trim() == "/" {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_user_agent() {
        assert!(resolve_user_agent(None).contains("JobScout"));
        assert!(resolve_user_agent(Some("rotate")).contains("Mozilla"));
        assert_eq!(resolve_user_agent(Some("custom/1.0")), "custom/1.0");
    }

    #[test]
    fn test_robots_blanket_disallow() {
        assert!(robots_blocks_everything("user-agent: *\ndisallow: /"));
        assert!(!robots_blocks_everything("user-agent: *\ndisallow: /admin"));
        assert!(!robots_blocks_everything("user-agent: googlebot\ndisallow: /"));
        assert!(!robots_blocks_everything(""));
    }
}
