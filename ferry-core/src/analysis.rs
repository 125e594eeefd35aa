//! Organization discovery and migration planning
//!
//! Surveys the source organization before anything is migrated: per-project
//! repository and work-item inventory, a priority/effort rating per
//! repository, and a generated batch plan ordered by priority. A project or
//! repository that cannot be analyzed is recorded with its error and skipped
//! by the plan, never aborting the survey.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::model::MigrationTarget;
use crate::platform::SourcePlatform;
use crate::Result;

/// How urgently a repository is worth migrating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Expected amount of migration work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effort::High => write!(f, "high"),
            Effort::Medium => write!(f, "medium"),
            Effort::Low => write!(f, "low"),
        }
    }
}

/// One repository's share of the survey
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryAnalysis {
    pub name: String,
    pub id: String,
    pub size: u64,
    pub default_branch: Option<String>,
    pub pull_requests_count: usize,
    pub is_empty: bool,
    pub priority: Priority,
    pub effort: Effort,
    pub notes: Vec<String>,
    /// Present when the repository could not be analyzed
    pub error: Option<String>,
}

/// One project's share of the survey
#[derive(Debug, Clone, Serialize)]
pub struct ProjectAnalysis {
    pub name: String,
    pub id: String,
    pub repositories_count: usize,
    pub work_items_count: usize,
    pub work_item_types: BTreeMap<String, usize>,
    pub work_item_states: BTreeMap<String, usize>,
    pub total_pull_requests: usize,
    pub repositories: Vec<RepositoryAnalysis>,
    /// Present when the whole project could not be analyzed
    pub error: Option<String>,
}

/// The full survey of an organization (or one project of it)
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationAnalysis {
    pub generated_at: DateTime<Utc>,
    pub projects_analyzed: usize,
    pub projects: Vec<ProjectAnalysis>,
}

impl OrganizationAnalysis {
    /// Batch plan entries for every analyzable repository, highest priority
    /// first. Errored repositories and projects are left out.
    pub fn migration_plan(&self) -> Vec<MigrationTarget> {
        let mut rated: Vec<(Priority, MigrationTarget)> = Vec::new();

        for project in &self.projects {
            if project.error.is_some() {
                continue;
            }
            for repo in &project.repositories {
                if repo.error.is_some() {
                    continue;
                }
                rated.push((
                    repo.priority,
                    MigrationTarget {
                        migrate_issues: project.work_items_count > 0,
                        ..MigrationTarget::new(project.name.clone(), repo.name.clone())
                    },
                ));
            }
        }

        rated.sort_by(|a, b| b.0.cmp(&a.0));
        rated.into_iter().map(|(_, target)| target).collect()
    }
}

/// Survey the organization, or a single project when `project_filter` is
/// given.
pub async fn analyze_organization(
    source: &dyn SourcePlatform,
    project_filter: Option<&str>,
) -> Result<OrganizationAnalysis> {
    let mut projects = source.list_projects().await?;
    if let Some(name) = project_filter {
        projects.retain(|p| p.name == name);
        if projects.is_empty() {
            return Err(crate::Error::Migration(format!(
                "project {} not found in the organization",
                name
            )));
        }
    }

    info!(projects = projects.len(), "analyzing source organization");

    let mut analyzed = Vec::with_capacity(projects.len());
    for project in projects {
        analyzed.push(analyze_project(source, &project.name, &project.id).await);
    }

    Ok(OrganizationAnalysis {
        generated_at: Utc::now(),
        projects_analyzed: analyzed.len(),
        projects: analyzed,
    })
}

async fn analyze_project(
    source: &dyn SourcePlatform,
    project_name: &str,
    project_id: &str,
) -> ProjectAnalysis {
    let mut analysis = ProjectAnalysis {
        name: project_name.to_string(),
        id: project_id.to_string(),
        repositories_count: 0,
        work_items_count: 0,
        work_item_types: BTreeMap::new(),
        work_item_states: BTreeMap::new(),
        total_pull_requests: 0,
        repositories: Vec::new(),
        error: None,
    };

    let repositories = match source.list_repositories(project_name).await {
        Ok(repos) => repos,
        Err(e) => {
            warn!(project = project_name, error = %e, "project analysis failed");
            analysis.error = Some(e.to_string());
            return analysis;
        }
    };
    analysis.repositories_count = repositories.len();

    // A missing work-item permission degrades to empty counts, same as an
    // export would.
    match source.list_work_items(project_name).await {
        Ok(items) => {
            analysis.work_items_count = items.len();
            for item in &items {
                *analysis
                    .work_item_types
                    .entry(item.item_type.clone())
                    .or_default() += 1;
                *analysis
                    .work_item_states
                    .entry(item.state.clone())
                    .or_default() += 1;
            }
        }
        Err(e) => warn!(project = project_name, error = %e, "work items not analyzable"),
    }

    for repo in repositories {
        let mut entry = RepositoryAnalysis {
            name: repo.name.clone(),
            id: repo.id.clone(),
            size: repo.size_hint,
            default_branch: repo.default_branch.clone(),
            pull_requests_count: 0,
            is_empty: repo.size_hint == 0,
            priority: Priority::Low,
            effort: Effort::Low,
            notes: Vec::new(),
            error: None,
        };

        match source.list_pull_requests(project_name, &repo.id).await {
            Ok(prs) => entry.pull_requests_count = prs.len(),
            Err(e) => {
                warn!(repo = %repo.name, error = %e, "repository not analyzable");
                entry.error = Some(e.to_string());
                analysis.repositories.push(entry);
                continue;
            }
        }
        analysis.total_pull_requests += entry.pull_requests_count;

        entry.priority = migration_priority(
            entry.size,
            entry.pull_requests_count,
            analysis.work_items_count,
            entry.is_empty,
        );
        entry.effort = migration_effort(
            entry.size,
            entry.pull_requests_count,
            analysis.work_items_count,
        );

        if entry.is_empty {
            entry.notes.push("repository is empty".to_string());
        }
        if entry.pull_requests_count > 100 {
            entry.notes.push(format!(
                "high pull request activity ({})",
                entry.pull_requests_count
            ));
        }
        if analysis.work_items_count > 500 {
            entry.notes.push(format!(
                "large number of work items ({})",
                analysis.work_items_count
            ));
            entry.effort = Effort::High;
        }

        analysis.repositories.push(entry);
    }

    analysis
}

/// Rate how worthwhile a repository migration is.
///
/// Size, pull-request activity and project work-item volume each add to the
/// score; an empty repository drops straight to low.
pub fn migration_priority(
    size: u64,
    pull_requests: usize,
    work_items: usize,
    is_empty: bool,
) -> Priority {
    if is_empty {
        return Priority::Low;
    }

    let mut score = 0i32;
    if size > 1_000_000 {
        score += 2;
    } else if size > 100_000 {
        score += 1;
    }
    if pull_requests > 50 {
        score += 2;
    } else if pull_requests > 10 {
        score += 1;
    }
    if work_items > 100 {
        score += 2;
    } else if work_items > 10 {
        score += 1;
    }

    if score >= 4 {
        Priority::High
    } else if score >= 2 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Estimate how much work the migration itself will be.
pub fn migration_effort(size: u64, pull_requests: usize, work_items: usize) -> Effort {
    let mut score = 0i32;
    if pull_requests > 100 {
        score += 2;
    } else if pull_requests > 20 {
        score += 1;
    }
    if work_items > 200 {
        score += 2;
    } else if work_items > 50 {
        score += 1;
    }
    if size > 5_000_000 {
        score += 2;
    } else if size > 1_000_000 {
        score += 1;
    }

    if score >= 4 {
        Effort::High
    } else if score >= 2 {
        Effort::Medium
    } else {
        Effort::Low
    }
}
