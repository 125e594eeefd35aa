//! Migrate command - Move one repository to the target platform

use anyhow::bail;
use clap::Args;

use ferry_core::{Config, MigrationTarget, PipelineScope, RunOptions};

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Source project containing the repository
    #[arg(short, long)]
    pub project: String,

    /// Repository to migrate
    #[arg(short, long)]
    pub repo: String,

    /// Name for the migrated repository (defaults to the source name)
    #[arg(long)]
    pub target_repo: Option<String>,

    /// Log intent without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip work item replication
    #[arg(long)]
    pub no_issues: bool,

    /// Skip pipeline conversion
    #[arg(long)]
    pub no_pipelines: bool,

    /// Skip the git history transfer
    #[arg(long)]
    pub no_git: bool,

    /// Which pipelines to export: project or repository
    #[arg(long, value_parser = parse_scope)]
    pub pipelines_scope: Option<PipelineScope>,

    /// Drop disabled or paused pipelines from the export
    #[arg(long)]
    pub exclude_disabled_pipelines: bool,

    /// After pushing, compare remote branches against the local mirror
    #[arg(long)]
    pub verify_remote: bool,

    /// Permit workflow publication even from this tool's own source tree
    #[arg(long, hide = true)]
    pub allow_local_workflows: bool,
}

pub(crate) fn parse_scope(value: &str) -> Result<PipelineScope, String> {
    match value {
        "project" => Ok(PipelineScope::Project),
        "repository" => Ok(PipelineScope::Repository),
        other => Err(format!(
            "invalid scope {:?}, expected \"project\" or \"repository\"",
            other
        )),
    }
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let orchestrator = super::build_orchestrator(config)?;
        orchestrator.validate_credentials().await?;

        let spec = MigrationTarget {
            project: self.project.clone(),
            repo: self.repo.clone(),
            target_repo: self.target_repo.clone(),
            migrate_issues: !self.no_issues,
            migrate_pipelines: !self.no_pipelines,
            migrate_git_history: !self.no_git,
            description: None,
        };
        let opts = RunOptions {
            dry_run: self.dry_run,
            skip_git: self.no_git,
            verify_remote: self.verify_remote,
            pipeline_scope: self.pipelines_scope,
            exclude_disabled_pipelines: self.exclude_disabled_pipelines,
            allow_local_workflows: self.allow_local_workflows,
        };

        let outcome = orchestrator.migrate_repository(&spec, &opts).await;

        println!();
        println!("Migration of {}/{}", spec.project, spec.repo);
        println!("================================");
        for step in &outcome.state.completed_steps {
            println!("  done    {}", step);
        }
        for step in &outcome.state.failed_steps {
            println!("  FAILED  {}", step);
        }
        let stats = &outcome.report.statistics;
        println!();
        println!("  branches: {}", stats.branches_count);
        println!(
            "  work items: {}/{} migrated",
            stats.work_items_migrated, stats.work_items_count
        );
        println!(
            "  pipelines: {}/{} converted",
            stats.pipelines_converted, stats.pipelines_count
        );
        println!(
            "  git history: {}",
            if stats.git_history_migrated { "migrated" } else { "not migrated" }
        );

        if let Some(step) = outcome.failed_step {
            bail!("migration failed at step: {}", step);
        }
        Ok(())
    }
}
