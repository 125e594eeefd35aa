//! Platform client traits
//!
//! The orchestrator only depends on these seams; the ferry-devops and
//! ferry-github crates provide the real REST implementations, and tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::model::{
    Pipeline, PipelineScope, Project, PullRequest, Repository, TargetRepository, WorkItem,
};
use crate::Result;

/// Typed read operations against the source platform.
///
/// Implementations retry transient failures internally and report
/// authentication problems on the identity check (`list_projects`) as
/// [`crate::Error::Auth`].
#[async_trait]
pub trait SourcePlatform: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>>;

    /// Look up a repository by name within a project
    async fn get_repository(&self, project: &str, name: &str) -> Result<Repository>;

    /// Branch names (short form, without the `refs/heads/` prefix)
    async fn list_branches(&self, project: &str, repo_id: &str) -> Result<Vec<String>>;

    async fn list_pull_requests(&self, project: &str, repo_id: &str) -> Result<Vec<PullRequest>>;

    async fn list_work_items(&self, project: &str) -> Result<Vec<WorkItem>>;

    /// Pipelines in the project, or only those bound to `repo_id` when the
    /// scope is [`PipelineScope::Repository`]
    async fn list_pipelines(
        &self,
        project: &str,
        repo_id: &str,
        scope: PipelineScope,
    ) -> Result<Vec<Pipeline>>;
}

/// Typed operations against the target platform.
#[async_trait]
pub trait TargetPlatform: Send + Sync {
    async fn repository_exists(&self, name: &str) -> Result<bool>;

    async fn get_repository(&self, name: &str) -> Result<Option<TargetRepository>>;

    /// Create a repository, or return the existing one if the name is taken.
    ///
    /// Invalid names are rejected, never silently fixed.
    async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<TargetRepository>;

    /// Create an issue; returns the issue number
    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<u64>;

    /// Remaining API quota, for pre-flight checks
    async fn rate_limit_remaining(&self) -> Result<u64>;
}
