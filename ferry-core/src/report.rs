//! Migration report generation
//!
//! Every run produces a JSON report and a short text summary, whether it
//! succeeded or failed. The report is the durable record of what was
//! migrated, what was skipped and what went wrong.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::model::{MigrationStatistics, RepositorySnapshot, VerificationResult};
use crate::orchestrator::state::MigrationState;
use crate::Result;

static UNSAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("filename regex"));

/// Run metadata embedded in every report
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub tool_version: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub dry_run: bool,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
}

/// Where the repository came from
#[derive(Debug, Clone, Serialize)]
pub struct SourceDescriptor {
    pub project: String,
    pub repository: String,
}

/// Where the repository went
#[derive(Debug, Clone, Serialize)]
pub struct TargetDescriptor {
    pub repository: String,
    /// Browse URL of the provisioned repository, when one was created
    pub html_url: Option<String>,
}

/// The full migration report serialized to disk
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub metadata: ReportMetadata,
    pub source: SourceDescriptor,
    pub target: TargetDescriptor,
    pub success: bool,
    /// Label of the step that failed, absent on success
    pub failed_step: Option<String>,
    pub statistics: MigrationStatistics,
    pub verification: Option<VerificationResult>,
    /// Raw exported data, included only when configured
    pub snapshot: Option<RepositorySnapshot>,
}

/// Writes reports and summaries under the configured output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    save_raw: bool,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, save_raw: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            save_raw,
        }
    }

    /// Assemble the report for one finished run.
    #[allow(clippy::too_many_arguments)]
    pub fn build_report(
        &self,
        project: &str,
        source_repo: &str,
        target_repo: &str,
        target_html_url: Option<String>,
        state: &MigrationState,
        statistics: MigrationStatistics,
        verification: Option<VerificationResult>,
        snapshot: Option<RepositorySnapshot>,
        dry_run: bool,
        failed_step: Option<String>,
    ) -> MigrationReport {
        MigrationReport {
            metadata: ReportMetadata {
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now(),
                duration_seconds: state.elapsed_seconds(),
                dry_run,
                completed_steps: state.completed_steps.clone(),
                failed_steps: state.failed_steps.clone(),
            },
            source: SourceDescriptor {
                project: project.to_string(),
                repository: source_repo.to_string(),
            },
            target: TargetDescriptor {
                repository: target_repo.to_string(),
                html_url: target_html_url,
            },
            success: failed_step.is_none(),
            failed_step,
            statistics,
            verification,
            snapshot: if self.save_raw { snapshot } else { None },
        }
    }

    /// Write the JSON report and return its path.
    pub fn write_report(&self, report: &MigrationReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let timestamp = report.metadata.generated_at.format("%Y%m%d_%H%M%S");
        let name = format!(
            "migration_report_{}_{}_{}.json",
            file_slug(&report.source.project),
            file_slug(&report.source.repository),
            timestamp
        );
        let path = self.output_dir.join(name);
        std::fs::write(&path, serde_json::to_vec_pretty(report)?)?;
        info!(path = %path.display(), "migration report written");
        Ok(path)
    }

    /// Write a human-readable summary covering one or more reports.
    pub fn write_summary(&self, reports: &[MigrationReport]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self
            .output_dir
            .join(format!("migration_summary_{}.txt", timestamp));
        std::fs::write(&path, render_summary(reports))?;
        info!(path = %path.display(), "migration summary written");
        Ok(path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn render_summary(reports: &[MigrationReport]) -> String {
    let mut out = String::new();
    out.push_str("Migration Summary\n");
    out.push_str("=================\n\n");

    let succeeded = reports.iter().filter(|r| r.success).count();
    out.push_str(&format!(
        "Runs: {}  Succeeded: {}  Failed: {}\n\n",
        reports.len(),
        succeeded,
        reports.len() - succeeded
    ));

    for report in reports {
        let status = if report.success { "OK " } else { "FAIL" };
        out.push_str(&format!(
            "[{}] {}/{} -> {}",
            status, report.source.project, report.source.repository, report.target.repository
        ));
        if report.metadata.dry_run {
            out.push_str(" (dry run)");
        }
        out.push('\n');
        if let Some(step) = &report.failed_step {
            out.push_str(&format!("       failed at: {}\n", step));
        }
        let s = &report.statistics;
        out.push_str(&format!(
            "       branches: {}  work items: {}/{}  pipelines converted: {}/{}  git history: {}\n",
            s.branches_count,
            s.work_items_migrated,
            s.work_items_count,
            s.pipelines_converted,
            s.pipelines_count,
            if s.git_history_migrated { "yes" } else { "no" }
        ));
    }

    out
}

fn file_slug(value: &str) -> String {
    let slug = UNSAFE_FILENAME.replace_all(value, "_").into_owned();
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}
