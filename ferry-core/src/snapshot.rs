//! Source data export
//!
//! Builds the read-only [`RepositorySnapshot`] for one migration run. A
//! missing work-item permission degrades gracefully: repository and branch
//! data are still returned, the work-item list stays empty, and the failure
//! reason is recorded on the snapshot.

use tracing::{info, warn};

use crate::model::{PipelineScope, RepositorySnapshot};
use crate::platform::SourcePlatform;
use crate::Result;

/// What an export should cover
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub include_work_items: bool,
    pub pipeline_scope: PipelineScope,
    pub exclude_disabled_pipelines: bool,
}

/// Export everything the migration needs from the source platform.
pub async fn export_snapshot(
    source: &dyn SourcePlatform,
    project: &str,
    repo_name: &str,
    options: ExportOptions,
) -> Result<RepositorySnapshot> {
    info!(project, repo = repo_name, "exporting source repository data");

    let repository = source.get_repository(project, repo_name).await?;

    let branches = match source.list_branches(project, &repository.id).await {
        Ok(branches) => branches,
        Err(e) => {
            warn!(error = %e, "could not list branches, continuing with empty list");
            Vec::new()
        }
    };

    let pull_requests = source.list_pull_requests(project, &repository.id).await?;

    let (work_items, work_items_error) = if options.include_work_items {
        match source.list_work_items(project).await {
            Ok(items) => (items, None),
            Err(e) => {
                warn!(error = %e, "skipping work item retrieval");
                (Vec::new(), Some(e.to_string()))
            }
        }
    } else {
        (Vec::new(), None)
    };

    let mut pipelines = source
        .list_pipelines(project, &repository.id, options.pipeline_scope)
        .await?;

    if options.exclude_disabled_pipelines {
        let before = pipelines.len();
        pipelines.retain(|p| !p.is_disabled());
        if pipelines.len() != before {
            info!(before, after = pipelines.len(), "filtered disabled pipelines");
        }
    }

    let size_estimate = repository.size_hint;

    info!(
        branches = branches.len(),
        pull_requests = pull_requests.len(),
        work_items = work_items.len(),
        pipelines = pipelines.len(),
        "repository data exported"
    );

    Ok(RepositorySnapshot {
        repository,
        size_estimate,
        branches,
        pull_requests,
        work_items,
        work_items_error,
        pipelines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::model::{Pipeline, Project, PullRequest, Repository, WorkItem};
    use crate::Error;

    struct DeniedWorkItemsSource;

    #[async_trait]
    impl SourcePlatform for DeniedWorkItemsSource {
        async fn list_projects(&self) -> crate::Result<Vec<Project>> {
            Ok(vec![])
        }

        async fn list_repositories(&self, _project: &str) -> crate::Result<Vec<Repository>> {
            Ok(vec![])
        }

        async fn get_repository(&self, _project: &str, name: &str) -> crate::Result<Repository> {
            Ok(Repository {
                id: "r1".to_string(),
                name: name.to_string(),
                clone_url: "https://dev.example.com/Proj/_git/repo".to_string(),
                default_branch: Some("main".to_string()),
                size_hint: 512,
                description: None,
            })
        }

        async fn list_branches(&self, _project: &str, _repo_id: &str) -> crate::Result<Vec<String>> {
            Ok(vec!["main".to_string(), "develop".to_string()])
        }

        async fn list_pull_requests(
            &self,
            _project: &str,
            _repo_id: &str,
        ) -> crate::Result<Vec<PullRequest>> {
            Ok(vec![])
        }

        async fn list_work_items(&self, _project: &str) -> crate::Result<Vec<WorkItem>> {
            Err(Error::Auth("work item read scope missing".to_string()))
        }

        async fn list_pipelines(
            &self,
            _project: &str,
            _repo_id: &str,
            _scope: PipelineScope,
        ) -> crate::Result<Vec<Pipeline>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_work_item_failure_degrades_without_losing_branches() {
        let snapshot = export_snapshot(
            &DeniedWorkItemsSource,
            "Proj",
            "repo",
            ExportOptions {
                include_work_items: true,
                pipeline_scope: PipelineScope::Project,
                exclude_disabled_pipelines: false,
            },
        )
        .await
        .unwrap();

        assert!(snapshot.work_items.is_empty());
        let reason = snapshot.work_items_error.expect("failure reason recorded");
        assert!(reason.contains("work item read scope missing"));
        assert_eq!(snapshot.branches, vec!["main", "develop"]);
        assert_eq!(snapshot.repository.name, "repo");
    }

    #[tokio::test]
    async fn test_work_items_not_requested_leaves_no_error() {
        let snapshot = export_snapshot(
            &DeniedWorkItemsSource,
            "Proj",
            "repo",
            ExportOptions {
                include_work_items: false,
                pipeline_scope: PipelineScope::Project,
                exclude_disabled_pipelines: false,
            },
        )
        .await
        .unwrap();

        assert!(snapshot.work_items.is_empty());
        assert!(snapshot.work_items_error.is_none());
    }
}
