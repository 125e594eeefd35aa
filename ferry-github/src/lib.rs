//! Ferry GitHub - GitHub integration for GitFerry
//!
//! This crate implements the target side of a migration: provisioning
//! repositories, replicating work items as issues and checking API quota
//! over the GitHub REST API.

mod client;
mod issues;
mod repos;

pub use client::GitHubClient;

use async_trait::async_trait;

use ferry_core::model::TargetRepository;
use ferry_core::{Result, TargetPlatform};

#[async_trait]
impl TargetPlatform for GitHubClient {
    async fn repository_exists(&self, name: &str) -> Result<bool> {
        GitHubClient::repository_exists(self, name).await
    }

    async fn get_repository(&self, name: &str) -> Result<Option<TargetRepository>> {
        GitHubClient::get_repository(self, name).await
    }

    async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<TargetRepository> {
        GitHubClient::create_repository(self, name, description, private).await
    }

    async fn create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<u64> {
        GitHubClient::create_issue(self, repo, title, body, labels).await
    }

    async fn rate_limit_remaining(&self) -> Result<u64> {
        GitHubClient::rate_limit_remaining(self).await
    }
}
