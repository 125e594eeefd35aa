//! End-to-end orchestrator runs against in-memory platform fakes

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ferry_core::model::{
    Pipeline, PipelineScope, Project, PullRequest, Repository, TargetRepository, WorkItem,
};
use ferry_core::orchestrator::SKIPPED_GIT_LABEL;
use ferry_core::{
    Config, Error, MigrationOrchestrator, MigrationTarget, Result, RunOptions, SourcePlatform,
    TargetPlatform,
};

struct FakeSource {
    repository: Option<Repository>,
    work_items: Result<Vec<WorkItem>>,
    pipelines: Vec<Pipeline>,
}

impl FakeSource {
    fn with_repository() -> Self {
        Self {
            repository: Some(Repository {
                id: "repo-id-1".to_string(),
                name: "repo".to_string(),
                clone_url: "https://dev.example.com/Proj/_git/repo".to_string(),
                default_branch: Some("main".to_string()),
                size_hint: 2048,
                description: Some("sample service".to_string()),
            }),
            work_items: Ok(vec![
                work_item(1, "First item"),
                work_item(2, "Second item"),
            ]),
            pipelines: vec![Pipeline {
                id: 10,
                name: "CI Build".to_string(),
                queue_status: Some("enabled".to_string()),
                repository_id: Some("repo-id-1".to_string()),
            }],
        }
    }
}

fn work_item(id: u64, title: &str) -> WorkItem {
    WorkItem {
        id,
        item_type: "Task".to_string(),
        state: "New".to_string(),
        title: title.to_string(),
        description: Some("<p>details</p>".to_string()),
        assignee: None,
        priority: None,
        area_path: None,
        created: None,
    }
}

#[async_trait]
impl SourcePlatform for FakeSource {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(vec![Project {
            id: "p1".to_string(),
            name: "Proj".to_string(),
            description: None,
            state: None,
        }])
    }

    async fn list_repositories(&self, _project: &str) -> Result<Vec<Repository>> {
        Ok(self.repository.iter().cloned().collect())
    }

    async fn get_repository(&self, project: &str, name: &str) -> Result<Repository> {
        self.repository
            .clone()
            .filter(|r| r.name == name)
            .ok_or_else(|| {
                Error::Migration(format!("repository {} not found in project {}", name, project))
            })
    }

    async fn list_branches(&self, _project: &str, _repo_id: &str) -> Result<Vec<String>> {
        Ok(vec!["main".to_string(), "develop".to_string()])
    }

    async fn list_pull_requests(&self, _project: &str, _repo_id: &str) -> Result<Vec<PullRequest>> {
        Ok(vec![])
    }

    async fn list_work_items(&self, _project: &str) -> Result<Vec<WorkItem>> {
        match &self.work_items {
            Ok(items) => Ok(items.clone()),
            Err(e) => Err(Error::Migration(e.to_string())),
        }
    }

    async fn list_pipelines(
        &self,
        _project: &str,
        _repo_id: &str,
        _scope: PipelineScope,
    ) -> Result<Vec<Pipeline>> {
        Ok(self.pipelines.clone())
    }
}

#[derive(Default)]
struct FakeTarget {
    created_repos: Mutex<Vec<String>>,
    created_issues: Mutex<Vec<String>>,
    failing_issue_title: Option<String>,
}

#[async_trait]
impl TargetPlatform for FakeTarget {
    async fn repository_exists(&self, name: &str) -> Result<bool> {
        Ok(self.created_repos.lock().unwrap().iter().any(|r| r == name))
    }

    async fn get_repository(&self, name: &str) -> Result<Option<TargetRepository>> {
        if self.repository_exists(name).await? {
            Ok(Some(TargetRepository::placeholder(Some("org"), name)))
        } else {
            Ok(None)
        }
    }

    async fn create_repository(
        &self,
        name: &str,
        _description: Option<&str>,
        _private: bool,
    ) -> Result<TargetRepository> {
        self.created_repos.lock().unwrap().push(name.to_string());
        Ok(TargetRepository::placeholder(Some("org"), name))
    }

    async fn create_issue(
        &self,
        _repo: &str,
        title: &str,
        _body: &str,
        _labels: &[String],
    ) -> Result<u64> {
        if self.failing_issue_title.as_deref() == Some(title) {
            return Err(Error::Http("503 service unavailable".to_string()));
        }
        let mut issues = self.created_issues.lock().unwrap();
        issues.push(title.to_string());
        Ok(issues.len() as u64)
    }

    async fn rate_limit_remaining(&self) -> Result<u64> {
        Ok(5000)
    }
}

fn test_config(output_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.source.organization = "org".to_string();
    config.source.personal_access_token = "pat".to_string();
    config.target.token = "tok".to_string();
    config.target.organization = Some("org".to_string());
    config.output.directory = output_dir.to_path_buf();
    config
}

fn orchestrator_with(
    source: FakeSource,
    target: Arc<FakeTarget>,
    output_dir: &std::path::Path,
) -> MigrationOrchestrator {
    MigrationOrchestrator::new(Arc::new(source), target, test_config(output_dir))
}

#[tokio::test]
async fn dry_run_completes_without_side_effects() {
    let out = tempfile::tempdir().unwrap();
    let target = Arc::new(FakeTarget::default());
    let orchestrator = orchestrator_with(FakeSource::with_repository(), target.clone(), out.path());

    let spec = MigrationTarget {
        migrate_git_history: false,
        ..MigrationTarget::new("Proj", "repo")
    };
    let opts = RunOptions {
        dry_run: true,
        ..Default::default()
    };
    let outcome = orchestrator.migrate_repository(&spec, &opts).await;

    assert!(outcome.success, "failed at {:?}", outcome.failed_step);
    assert!(target.created_repos.lock().unwrap().is_empty());
    assert!(target.created_issues.lock().unwrap().is_empty());
    assert!(!outcome.report.statistics.git_history_migrated);
    assert!(outcome
        .state
        .completed_steps
        .iter()
        .any(|s| s == SKIPPED_GIT_LABEL));
    // Counted as they would be migrated, nothing actually created
    assert_eq!(outcome.report.statistics.work_items_migrated, 2);
}

#[tokio::test]
async fn skipped_git_recorded_in_ledger() {
    let out = tempfile::tempdir().unwrap();
    let target = Arc::new(FakeTarget::default());
    let orchestrator = orchestrator_with(FakeSource::with_repository(), target, out.path());

    let spec = MigrationTarget {
        migrate_pipelines: false,
        ..MigrationTarget::new("Proj", "repo")
    };
    let opts = RunOptions {
        skip_git: true,
        ..Default::default()
    };
    let outcome = orchestrator.migrate_repository(&spec, &opts).await;

    assert!(outcome.success, "failed at {:?}", outcome.failed_step);
    assert!(outcome
        .state
        .completed_steps
        .iter()
        .any(|s| s == SKIPPED_GIT_LABEL));
    assert!(!outcome.report.statistics.git_history_migrated);
}

#[tokio::test]
async fn work_items_replicate_with_partial_failures() {
    let out = tempfile::tempdir().unwrap();
    let target = Arc::new(FakeTarget {
        failing_issue_title: Some("Second item".to_string()),
        ..Default::default()
    });
    let orchestrator = orchestrator_with(FakeSource::with_repository(), target.clone(), out.path());

    let spec = MigrationTarget {
        migrate_pipelines: false,
        ..MigrationTarget::new("Proj", "repo")
    };
    let opts = RunOptions {
        skip_git: true,
        ..Default::default()
    };
    let outcome = orchestrator.migrate_repository(&spec, &opts).await;

    assert!(outcome.success, "failed at {:?}", outcome.failed_step);
    assert_eq!(outcome.report.statistics.work_items_migrated, 1);
    assert_eq!(outcome.report.statistics.work_item_failures, 1);
    assert_eq!(
        target.created_issues.lock().unwrap().as_slice(),
        ["First item"]
    );
}

#[tokio::test]
async fn work_item_export_failure_degrades_gracefully() {
    let out = tempfile::tempdir().unwrap();
    let mut source = FakeSource::with_repository();
    source.work_items = Err(Error::Migration("missing work item read scope".to_string()));
    let target = Arc::new(FakeTarget::default());
    let orchestrator = orchestrator_with(source, target.clone(), out.path());

    let spec = MigrationTarget {
        migrate_pipelines: false,
        ..MigrationTarget::new("Proj", "repo")
    };
    let opts = RunOptions {
        skip_git: true,
        ..Default::default()
    };
    let outcome = orchestrator.migrate_repository(&spec, &opts).await;

    assert!(outcome.success, "failed at {:?}", outcome.failed_step);
    assert_eq!(outcome.report.statistics.work_items_count, 0);
    assert_eq!(outcome.report.statistics.work_items_migrated, 0);
    assert!(target.created_issues.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_repository_fails_first_step_and_still_reports() {
    let out = tempfile::tempdir().unwrap();
    let source = FakeSource {
        repository: None,
        work_items: Ok(vec![]),
        pipelines: vec![],
    };
    let target = Arc::new(FakeTarget::default());
    let orchestrator = orchestrator_with(source, target, out.path());

    let spec = MigrationTarget::new("Proj", "ghost");
    let outcome = orchestrator
        .migrate_repository(&spec, &RunOptions::default())
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failed_step.as_deref(),
        Some("Validating prerequisites")
    );
    assert_eq!(
        outcome.state.failed_steps,
        vec!["Validating prerequisites"]
    );

    // The report is written even for a failed run
    let reports: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("migration_report_")
        })
        .collect();
    assert_eq!(reports.len(), 1);
}

#[tokio::test]
async fn batch_continues_past_failures() {
    let out = tempfile::tempdir().unwrap();
    let target = Arc::new(FakeTarget::default());
    let orchestrator = orchestrator_with(FakeSource::with_repository(), target, out.path());

    let specs = vec![
        MigrationTarget::new("Proj", "ghost"),
        MigrationTarget {
            migrate_pipelines: false,
            ..MigrationTarget::new("Proj", "repo")
        },
    ];
    let opts = RunOptions {
        skip_git: true,
        ..Default::default()
    };
    let outcomes = orchestrator.migrate_batch(&specs, &opts).await;

    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].success);
    assert!(outcomes[1].success, "failed at {:?}", outcomes[1].failed_step);

    let summaries: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("migration_summary_")
        })
        .collect();
    assert_eq!(summaries.len(), 1);
}

#[tokio::test]
async fn renamed_target_repository_is_used() {
    let out = tempfile::tempdir().unwrap();
    let target = Arc::new(FakeTarget::default());
    let orchestrator = orchestrator_with(FakeSource::with_repository(), target.clone(), out.path());

    let spec = MigrationTarget {
        target_repo: Some("renamed-repo".to_string()),
        migrate_pipelines: false,
        ..MigrationTarget::new("Proj", "repo")
    };
    let opts = RunOptions {
        skip_git: true,
        ..Default::default()
    };
    let outcome = orchestrator.migrate_repository(&spec, &opts).await;

    assert!(outcome.success, "failed at {:?}", outcome.failed_step);
    assert_eq!(
        target.created_repos.lock().unwrap().as_slice(),
        ["renamed-repo"]
    );
    assert_eq!(outcome.report.target.repository, "renamed-repo");
}
