//! Issue creation and quota checks

use serde::Deserialize;
use tracing::debug;

use ferry_core::Result;

use crate::client::GitHubClient;

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct GhRateLimit {
    rate: GhRate,
}

#[derive(Debug, Deserialize)]
struct GhRate {
    remaining: u64,
}

impl GitHubClient {
    /// Create an issue and return its number.
    ///
    /// Not retried: a timed-out create may still have landed, and a
    /// duplicate issue is worse than a missing one the report will flag.
    pub async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<u64> {
        let owner = self.owner().await?.to_string();
        let url = self.api_url(&["repos", &owner, repo, "issues"])?;
        let payload = serde_json::json!({
            "title": title,
            "body": body,
            "labels": labels,
        });
        let issue: GhIssue = self.post_json(url, payload).await?;
        debug!(repo, number = issue.number, "issue created");
        Ok(issue.number)
    }

    /// Remaining core API quota
    pub async fn rate_limit_remaining(&self) -> Result<u64> {
        let url = self.api_url(&["rate_limit"])?;
        let limit: GhRateLimit = self.get_json(url).await?;
        Ok(limit.rate.remaining)
    }
}
