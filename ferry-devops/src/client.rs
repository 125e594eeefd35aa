//! Azure DevOps REST API client

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use ferry_core::config::SourceConfig;
use ferry_core::model::{Pipeline, PipelineScope, Project, PullRequest, Repository, WorkItem};
use ferry_core::{Error, RateLimiter, Result, RetryPolicy, SourcePlatform};

use crate::models::{
    strip_heads, AdoPipeline, AdoProject, AdoPullRequest, AdoRef, AdoRepository, AdoWorkItem,
    ValueList, WiqlResponse,
};

const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
const API_VERSION: &str = "7.0";
const WORK_ITEM_BATCH: usize = 200;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the source platform's REST API.
///
/// Read calls are throttled and retried; authentication failures surface as
/// [`Error::Auth`] so the caller can stop early.
pub struct DevOpsClient {
    http: reqwest::Client,
    base_url: Url,
    organization: String,
    pat: String,
    retry: RetryPolicy,
    throttle: RateLimiter,
}

impl DevOpsClient {
    pub fn new(config: &SourceConfig, retry: RetryPolicy, throttle: RateLimiter) -> Result<Self> {
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base)
            .map_err(|e| Error::Config(format!("invalid source base url {}: {}", base, e)))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("gitferry/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Http(format!("failed to build http client: {}", e)))?;

        info!(organization = %config.organization, "created source platform client");

        Ok(Self {
            http,
            base_url,
            organization: config.organization.clone(),
            pat: config.personal_access_token.clone(),
            retry,
            throttle,
        })
    }

    /// Build an API URL under the organization.
    ///
    /// Path segments are appended individually so names with spaces or
    /// slashes come out correctly encoded.
    fn api_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::Config("source base url cannot carry paths".to_string()))?;
            path.pop_if_empty();
            path.push(&self.organization);
            path.extend(segments);
        }
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", API_VERSION);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.retry
            .run("devops get", || {
                let url = url.clone();
                async move { self.fetch_json(url).await }
            })
            .await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.throttle.acquire().await;
        debug!(path = url.path(), "source api request");

        let response = self
            .http
            .get(url)
            .basic_auth("", Some(&self.pat))
            .send()
            .await
            .map_err(|e| Error::Http(format!("source request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &response.text().await.unwrap_or_default()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Http(format!("source response decode failed: {}", e)))
    }

    async fn post_json<T: DeserializeOwned>(&self, url: Url, body: serde_json::Value) -> Result<T> {
        self.throttle.acquire().await;
        debug!(path = url.path(), "source api query");

        let response = self
            .http
            .post(url)
            .basic_auth("", Some(&self.pat))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("source request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &response.text().await.unwrap_or_default()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Http(format!("source response decode failed: {}", e)))
    }

    /// Query work item ids for the project, then fetch details in batches.
    async fn fetch_work_items(&self, project: &str) -> Result<Vec<WorkItem>> {
        let wiql_url = self.api_url(&[project, "_apis", "wit", "wiql"], &[])?;
        let query = serde_json::json!({
            "query": "Select [System.Id] From WorkItems \
                      Where [System.TeamProject] = @project \
                      Order By [System.Id]"
        });
        let refs: WiqlResponse = self.post_json(wiql_url, query).await?;

        let ids: Vec<u64> = refs.work_items.iter().map(|r| r.id).collect();
        let mut items = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(WORK_ITEM_BATCH) {
            let joined = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = self.api_url(
                &["_apis", "wit", "workitems"],
                &[("ids", joined.as_str()), ("$expand", "all")],
            )?;
            let batch: ValueList<AdoWorkItem> = self.get_json(url).await?;
            items.extend(batch.value.into_iter().map(WorkItem::from));
        }

        debug!(count = items.len(), "fetched work items");
        Ok(items)
    }
}

/// Map an API error status onto the engine's error kinds.
///
/// 401 and 403 are terminal authentication problems; 429 and server errors
/// are transient and eligible for retry.
fn classify_status(status: StatusCode, body: &str) -> Error {
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(format!(
            "source platform rejected the personal access token ({})",
            status
        )),
        StatusCode::TOO_MANY_REQUESTS => {
            Error::RateLimited(format!("source platform throttled the request: {}", snippet))
        }
        s if s.is_server_error() => {
            Error::Http(format!("source platform error {}: {}", s, snippet))
        }
        s => Error::Migration(format!("source request failed with {}: {}", s, snippet)),
    }
}

#[async_trait]
impl SourcePlatform for DevOpsClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let url = self.api_url(&["_apis", "projects"], &[])?;
        let list: ValueList<AdoProject> = self.get_json(url).await.map_err(|e| match e {
            // A bad organization name produces 404 here; report it as an
            // authentication problem rather than an empty workspace.
            Error::Migration(msg) if msg.contains("404") => Error::Auth(format!(
                "organization {} not found or not accessible",
                self.organization
            )),
            other => other,
        })?;
        Ok(list.value.into_iter().map(Project::from).collect())
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>> {
        let url = self.api_url(&[project, "_apis", "git", "repositories"], &[])?;
        let list: ValueList<AdoRepository> = self.get_json(url).await?;
        Ok(list.value.into_iter().map(Repository::from).collect())
    }

    async fn get_repository(&self, project: &str, name: &str) -> Result<Repository> {
        let url = self.api_url(&[project, "_apis", "git", "repositories", name], &[])?;
        self.get_json::<AdoRepository>(url)
            .await
            .map(Repository::from)
            .map_err(|e| match e {
                Error::Migration(msg) if msg.contains("404") => Error::Migration(format!(
                    "repository {} not found in project {}",
                    name, project
                )),
                other => other,
            })
    }

    async fn list_branches(&self, project: &str, repo_id: &str) -> Result<Vec<String>> {
        let url = self.api_url(
            &[project, "_apis", "git", "repositories", repo_id, "refs"],
            &[("filter", "heads/")],
        )?;
        let list: ValueList<AdoRef> = self.get_json(url).await?;
        Ok(list.value.into_iter().map(|r| strip_heads(r.name)).collect())
    }

    async fn list_pull_requests(&self, project: &str, repo_id: &str) -> Result<Vec<PullRequest>> {
        let url = self.api_url(
            &[project, "_apis", "git", "repositories", repo_id, "pullrequests"],
            &[("searchCriteria.status", "all")],
        )?;
        let list: ValueList<AdoPullRequest> = self.get_json(url).await?;
        Ok(list.value.into_iter().map(PullRequest::from).collect())
    }

    async fn list_work_items(&self, project: &str) -> Result<Vec<WorkItem>> {
        self.fetch_work_items(project).await
    }

    async fn list_pipelines(
        &self,
        project: &str,
        repo_id: &str,
        scope: PipelineScope,
    ) -> Result<Vec<Pipeline>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if scope == PipelineScope::Repository {
            query.push(("repositoryId", repo_id));
            query.push(("repositoryType", "TfsGit"));
        }
        let url = self.api_url(&[project, "_apis", "build", "definitions"], &query)?;
        let list: ValueList<AdoPipeline> = self.get_json(url).await?;
        Ok(list.value.into_iter().map(Pipeline::from).collect())
    }
}

impl std::fmt::Debug for DevOpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevOpsClient")
            .field("base_url", &self.base_url.as_str())
            .field("organization", &self.organization)
            .finish_non_exhaustive()
    }
}
