//! Domain types for a repository migration
//!
//! These are the platform-neutral shapes the orchestrator works with; the
//! platform crates map their wire formats into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a migration run or batch plan.
///
/// Immutable once a migration starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MigrationTarget {
    /// Source project the repository lives in
    pub project: String,

    /// Repository name on the source platform
    pub repo: String,

    /// Repository name on the target platform (defaults to `repo`)
    #[serde(default)]
    pub target_repo: Option<String>,

    /// Replicate work items as issues
    #[serde(default = "default_true")]
    pub migrate_issues: bool,

    /// Convert and publish CI pipelines
    #[serde(default = "default_true")]
    pub migrate_pipelines: bool,

    /// Transfer the git history
    #[serde(default = "default_true")]
    pub migrate_git_history: bool,

    /// Free-form note carried through batch plans
    #[serde(default)]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl MigrationTarget {
    pub fn new(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            target_repo: None,
            migrate_issues: true,
            migrate_pipelines: true,
            migrate_git_history: true,
            description: None,
        }
    }

    /// Name of the repository on the target platform
    pub fn target_repo_name(&self) -> &str {
        self.target_repo.as_deref().unwrap_or(&self.repo)
    }
}

/// Run-scoped options, passed explicitly into `migrate_repository`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log intent without touching disk or network
    pub dry_run: bool,

    /// Skip the git-history transfer step
    pub skip_git: bool,

    /// After pushing, compare remote branches against the local mirror
    pub verify_remote: bool,

    /// Override the configured pipeline scope
    pub pipeline_scope: Option<PipelineScope>,

    /// Drop disabled/paused pipelines from the export
    pub exclude_disabled_pipelines: bool,

    /// Permit workflow emission even when the working directory looks like
    /// the tool's own source tree
    pub allow_local_workflows: bool,
}

/// Which pipelines an export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineScope {
    /// All pipelines in the project
    Project,
    /// Only pipelines bound to the migrated repository
    Repository,
}

impl Default for PipelineScope {
    fn default() -> Self {
        PipelineScope::Project
    }
}

impl std::fmt::Display for PipelineScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineScope::Project => write!(f, "project"),
            PipelineScope::Repository => write!(f, "repository"),
        }
    }
}

/// A project on the source platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A repository on the source platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    /// HTTPS clone URL; may carry embedded userinfo that must be stripped
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Rough size in bytes, used only for the pre-flight warning
    #[serde(default)]
    pub size_hint: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// A pull request on the source platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub target_branch: Option<String>,
}

/// An issue-tracker record on the source platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkItem {
    pub id: u64,
    pub item_type: String,
    pub state: String,
    pub title: String,
    /// HTML description as stored by the source platform
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub area_path: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// A CI build definition on the source platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pipeline {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub queue_status: Option<String>,
    #[serde(default)]
    pub repository_id: Option<String>,
}

impl Pipeline {
    /// Disabled or paused pipelines can be excluded from an export
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.queue_status.as_deref().map(str::to_ascii_lowercase),
            Some(ref s) if s == "disabled" || s == "paused"
        )
    }
}

/// A repository on the target platform
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetRepository {
    pub name: String,
    pub clone_url: String,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl TargetRepository {
    /// Synthetic repository used in dry-run provisioning, built without any
    /// network call
    pub fn placeholder(organization: Option<&str>, name: &str) -> Self {
        let owner = organization.unwrap_or("personal");
        Self {
            name: name.to_string(),
            clone_url: format!("https://github.com/{}/{}.git", owner, name),
            html_url: format!("https://github.com/{}/{}", owner, name),
            default_branch: None,
        }
    }
}

/// Everything exported from the source platform for one migration run.
///
/// Built once, read-only afterwards, owned by the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct RepositorySnapshot {
    pub repository: Repository,
    pub size_estimate: u64,
    pub branches: Vec<String>,
    pub pull_requests: Vec<PullRequest>,
    pub work_items: Vec<WorkItem>,
    /// Why the work-item list is empty, when retrieval failed gracefully
    pub work_items_error: Option<String>,
    pub pipelines: Vec<Pipeline>,
}

/// Outcome of post-push mirror verification
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationResult {
    pub local_branch_count: usize,
    pub local_branch_names: Vec<String>,
    pub commit_count: usize,
    /// Present only when remote verification was requested and succeeded
    pub remote: Option<RemoteComparison>,
}

/// Branch-set comparison between the local mirror and the pushed target
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoteComparison {
    pub remote_branch_count: usize,
    pub remote_branch_names: Vec<String>,
    pub branches_match: bool,
    /// Branches present locally but absent on the remote
    pub missing_on_remote: Vec<String>,
    /// Branches present on the remote but absent locally
    pub missing_locally: Vec<String>,
}

/// Per-run counters surfaced in the report
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStatistics {
    pub repository_size_bytes: u64,
    pub branches_count: usize,
    pub pull_requests_count: usize,
    pub work_items_count: usize,
    pub pipelines_count: usize,
    pub pipelines_converted: usize,
    pub work_items_migrated: usize,
    pub work_item_failures: usize,
    pub git_history_migrated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let json = r#"{"project": "Proj", "repo": "svc"}"#;
        let target: MigrationTarget = serde_json::from_str(json).unwrap();
        assert!(target.migrate_issues);
        assert!(target.migrate_pipelines);
        assert!(target.migrate_git_history);
        assert_eq!(target.target_repo_name(), "svc");
    }

    #[test]
    fn test_target_repo_override() {
        let target = MigrationTarget {
            target_repo: Some("renamed".to_string()),
            ..MigrationTarget::new("Proj", "svc")
        };
        assert_eq!(target.target_repo_name(), "renamed");
    }

    #[test]
    fn test_pipeline_disabled_detection() {
        let mut pipeline = Pipeline {
            id: 1,
            name: "Build".to_string(),
            queue_status: Some("Disabled".to_string()),
            repository_id: None,
        };
        assert!(pipeline.is_disabled());
        pipeline.queue_status = Some("paused".to_string());
        assert!(pipeline.is_disabled());
        pipeline.queue_status = Some("enabled".to_string());
        assert!(!pipeline.is_disabled());
        pipeline.queue_status = None;
        assert!(!pipeline.is_disabled());
    }

    #[test]
    fn test_placeholder_urls() {
        let repo = TargetRepository::placeholder(Some("acme"), "svc");
        assert_eq!(repo.clone_url, "https://github.com/acme/svc.git");
        assert_eq!(repo.html_url, "https://github.com/acme/svc");
    }
}
