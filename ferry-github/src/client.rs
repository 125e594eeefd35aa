//! GitHub REST API client

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use ferry_core::config::TargetConfig;
use ferry_core::{Error, RateLimiter, Result, RetryPolicy};

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

/// Client for the target platform's REST API.
///
/// Read calls are throttled and retried. Creation calls are throttled but
/// never retried automatically, so a flaky network cannot produce duplicate
/// repositories or issues.
pub struct GitHubClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) organization: Option<String>,
    pub(crate) retry: RetryPolicy,
    pub(crate) throttle: RateLimiter,
    owner: OnceCell<String>,
}

impl GitHubClient {
    pub fn new(config: &TargetConfig, retry: RetryPolicy, throttle: RateLimiter) -> Result<Self> {
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base)
            .map_err(|e| Error::Config(format!("invalid target base url {}: {}", base, e)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", config.token))
            .map_err(|_| Error::Auth("target token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));

        let http = reqwest::Client::builder()
            .user_agent(concat!("gitferry/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Http(format!("failed to build http client: {}", e)))?;

        info!(
            organization = config.organization.as_deref().unwrap_or("(user account)"),
            "created target platform client"
        );

        Ok(Self {
            http,
            base_url,
            organization: config.organization.clone(),
            retry,
            throttle,
            owner: OnceCell::new(),
        })
    }

    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::Config("target base url cannot carry paths".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Account the migrated repositories belong to: the configured
    /// organization, or the authenticated user's login.
    pub async fn owner(&self) -> Result<&str> {
        if let Some(org) = &self.organization {
            return Ok(org.as_str());
        }
        self.owner
            .get_or_try_init(|| async {
                let url = self.api_url(&["user"])?;
                let user: GhUser = self.get_json(url).await?;
                debug!(login = %user.login, "resolved authenticated user");
                Ok(user.login)
            })
            .await
            .map(String::as_str)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.retry
            .run("github get", || {
                let url = url.clone();
                async move { self.fetch_json(url).await }
            })
            .await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.throttle.acquire().await;
        debug!(path = url.path(), "target api request");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("target request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &response.text().await.unwrap_or_default()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Http(format!("target response decode failed: {}", e)))
    }

    /// Raw status of a GET, for existence checks where 404 is an answer,
    /// not an error
    pub(crate) async fn get_status(&self, url: Url) -> Result<StatusCode> {
        self.throttle.acquire().await;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("target request failed: {}", e)))?;
        Ok(response.status())
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: serde_json::Value,
    ) -> Result<T> {
        self.throttle.acquire().await;
        debug!(path = url.path(), "target api create");

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("target request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &response.text().await.unwrap_or_default()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Http(format!("target response decode failed: {}", e)))
    }
}

/// Map an API error status onto the engine's error kinds.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> Error {
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED => {
            Error::Auth(format!("target platform rejected the token ({})", status))
        }
        StatusCode::FORBIDDEN if snippet.contains("rate limit") => {
            Error::RateLimited(format!("target platform rate limit: {}", snippet))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            Error::RateLimited(format!("target platform throttled the request: {}", snippet))
        }
        s if s.is_server_error() => {
            Error::Http(format!("target platform error {}: {}", s, snippet))
        }
        s => Error::Migration(format!("target request failed with {}: {}", s, snippet)),
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url.as_str())
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_client(organization: Option<&str>) -> GitHubClient {
        GitHubClient::new(
            &TargetConfig {
                token: "ghp_test".to_string(),
                organization: organization.map(str::to_string),
                create_private_repos: true,
                base_url: None,
            },
            RetryPolicy::default(),
            RateLimiter::new(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_api_url() {
        let client = test_client(None);
        let url = client.api_url(&["repos", "org", "repo", "issues"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/org/repo/issues");
    }

    #[tokio::test]
    async fn test_owner_prefers_configured_organization() {
        let client = test_client(Some("contoso-gh"));
        assert_eq!(client.owner().await.unwrap(), "contoso-gh");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "API rate limit exceeded"),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            Error::Http(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "name already exists"),
            Error::Migration(_)
        ));
    }
}
