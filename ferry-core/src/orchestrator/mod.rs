//! Migration orchestration
//!
//! Drives one repository migration through its ordered steps: validate,
//! export, provision, transfer history, convert pipelines, replicate work
//! items, report. A run is forward-only; a failed step aborts the remainder
//! but the report is still written, so [`MigrationOrchestrator::migrate_repository`]
//! returns an outcome rather than an error.

pub mod state;

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::git::{GitCredential, GitMigrator, TransferRequest};
use crate::model::{
    MigrationStatistics, MigrationTarget, RepositorySnapshot, RunOptions, TargetRepository,
    VerificationResult,
};
use crate::orchestrator::state::{MigrationState, MigrationStep};
use crate::pipeline::{publish_workflows, PipelineConverter};
use crate::platform::{SourcePlatform, TargetPlatform};
use crate::report::{MigrationReport, ReportWriter};
use crate::snapshot::{export_snapshot, ExportOptions};
use crate::workitem;
use crate::{Error, Result};

/// Ledger entry recorded when the transfer step is skipped on request
pub const SKIPPED_GIT_LABEL: &str = "Skipped git history (no-git)";

/// Everything a finished run hands back to the caller
#[derive(Debug)]
pub struct MigrationOutcome {
    pub success: bool,
    /// Label of the failed step, absent on success
    pub failed_step: Option<String>,
    pub state: MigrationState,
    pub report: MigrationReport,
}

/// Mutable context threaded through the steps of one run
#[derive(Debug, Default)]
struct RunContext {
    stats: MigrationStatistics,
    snapshot: Option<RepositorySnapshot>,
    target_repo: Option<TargetRepository>,
    verification: Option<VerificationResult>,
}

/// Coordinates one or more repository migrations.
pub struct MigrationOrchestrator {
    source: Arc<dyn SourcePlatform>,
    target: Arc<dyn TargetPlatform>,
    config: Config,
}

impl MigrationOrchestrator {
    pub fn new(
        source: Arc<dyn SourcePlatform>,
        target: Arc<dyn TargetPlatform>,
        config: Config,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Confirm both platforms accept the configured credentials.
    pub async fn validate_credentials(&self) -> Result<()> {
        let projects = self.source.list_projects().await?;
        info!(projects = projects.len(), "source credentials accepted");

        let remaining = self.target.rate_limit_remaining().await?;
        info!(remaining, "target credentials accepted");
        if remaining < 100 {
            warn!(remaining, "target API quota is nearly exhausted");
        }
        Ok(())
    }

    /// Migrate one repository end to end.
    ///
    /// Never returns an error: failures are captured on the outcome and the
    /// report is written either way.
    pub async fn migrate_repository(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
    ) -> MigrationOutcome {
        let target_repo_name = spec.target_repo_name().to_string();
        info!(
            project = %spec.project,
            repo = %spec.repo,
            target = %target_repo_name,
            dry_run = opts.dry_run,
            "starting repository migration"
        );

        let mut state = MigrationState::new();
        let mut ctx = RunContext::default();

        let failed_step = match self.run_steps(spec, opts, &mut state, &mut ctx).await {
            Ok(()) => None,
            Err(e) => {
                let step = state.current_step.clone();
                state.fail_current();
                error!(
                    step = step.as_deref().unwrap_or("unknown"),
                    error = %e,
                    "migration step failed"
                );
                Some(step.unwrap_or_else(|| "unknown".to_string()))
            }
        };

        state.begin(MigrationStep::GenerateReport);
        let writer = ReportWriter::new(
            self.config.output.directory.clone(),
            self.config.output.save_raw_data,
        );
        let report = writer.build_report(
            &spec.project,
            &spec.repo,
            &target_repo_name,
            ctx.target_repo.as_ref().map(|r| r.html_url.clone()),
            &state,
            ctx.stats.clone(),
            ctx.verification.clone(),
            ctx.snapshot.clone(),
            opts.dry_run,
            failed_step.clone(),
        );
        match writer.write_report(&report) {
            Ok(_) => state.complete(),
            Err(e) => {
                warn!(error = %e, "could not write migration report");
                state.fail_current();
            }
        }

        if failed_step.is_none() {
            info!(
                project = %spec.project,
                repo = %spec.repo,
                "repository migration finished"
            );
        }

        MigrationOutcome {
            success: failed_step.is_none(),
            failed_step,
            state,
            report,
        }
    }

    /// Migrate a list of repositories sequentially, continuing past
    /// failures, and write a combined summary.
    pub async fn migrate_batch(
        &self,
        specs: &[MigrationTarget],
        opts: &RunOptions,
    ) -> Vec<MigrationOutcome> {
        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            let outcome = self.migrate_repository(spec, opts).await;
            if !outcome.success {
                warn!(
                    project = %spec.project,
                    repo = %spec.repo,
                    "migration failed, continuing with remaining repositories"
                );
            }
            outcomes.push(outcome);
        }

        let writer = ReportWriter::new(
            self.config.output.directory.clone(),
            self.config.output.save_raw_data,
        );
        let reports: Vec<MigrationReport> =
            outcomes.iter().map(|o| o.report.clone()).collect();
        if let Err(e) = writer.write_summary(&reports) {
            warn!(error = %e, "could not write batch summary");
        }

        outcomes
    }

    async fn run_steps(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
        ctx: &mut RunContext,
    ) -> Result<()> {
        self.validate_prerequisites(spec, opts, state).await?;
        self.export_source_data(spec, opts, state, ctx).await?;
        self.provision_target(spec, opts, state, ctx).await?;
        self.transfer_git_history(spec, opts, state, ctx).await?;
        self.convert_pipelines(spec, opts, state, ctx).await?;
        self.replicate_work_items(spec, opts, state, ctx).await?;
        Ok(())
    }

    async fn validate_prerequisites(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
    ) -> Result<()> {
        state.begin(MigrationStep::ValidatePrerequisites);

        let repository = self.source.get_repository(&spec.project, &spec.repo).await?;
        if repository.size_hint > self.config.git.large_repo_warn_bytes {
            warn!(
                size_bytes = repository.size_hint,
                "repository is large, the history transfer may take a while"
            );
        }

        let wants_git = spec.migrate_git_history && !opts.skip_git && !opts.dry_run;
        if wants_git {
            let version = GitMigrator::new(self.config.git.operation_timeout)
                .check_git_available()
                .await?;
            info!(%version, "git binary available");
        }

        state.complete();
        Ok(())
    }

    async fn export_source_data(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
        ctx: &mut RunContext,
    ) -> Result<()> {
        state.begin(MigrationStep::ExportSourceData);

        let snapshot = export_snapshot(
            self.source.as_ref(),
            &spec.project,
            &spec.repo,
            ExportOptions {
                include_work_items: spec.migrate_issues,
                pipeline_scope: opts
                    .pipeline_scope
                    .unwrap_or(self.config.pipelines.scope),
                exclude_disabled_pipelines: opts.exclude_disabled_pipelines
                    || self.config.pipelines.exclude_disabled,
            },
        )
        .await?;

        ctx.stats.repository_size_bytes = snapshot.size_estimate;
        ctx.stats.branches_count = snapshot.branches.len();
        ctx.stats.pull_requests_count = snapshot.pull_requests.len();
        ctx.stats.work_items_count = snapshot.work_items.len();
        ctx.stats.pipelines_count = snapshot.pipelines.len();
        ctx.snapshot = Some(snapshot);

        state.complete();
        Ok(())
    }

    async fn provision_target(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
        ctx: &mut RunContext,
    ) -> Result<()> {
        state.begin(MigrationStep::ProvisionTarget);
        let name = spec.target_repo_name();

        let target_repo = if opts.dry_run {
            info!(repo = %name, "dry run, target repository not created");
            TargetRepository::placeholder(self.config.target.organization.as_deref(), name)
        } else {
            let description = spec
                .description
                .as_deref()
                .or_else(|| {
                    ctx.snapshot
                        .as_ref()
                        .and_then(|s| s.repository.description.as_deref())
                });
            self.target
                .create_repository(name, description, self.config.target.create_private_repos)
                .await?
        };

        info!(url = %target_repo.html_url, "target repository ready");
        ctx.target_repo = Some(target_repo);
        state.complete();
        Ok(())
    }

    async fn transfer_git_history(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
        ctx: &mut RunContext,
    ) -> Result<()> {
        if !spec.migrate_git_history || opts.skip_git {
            info!("git history transfer skipped on request");
            state.note_completed(SKIPPED_GIT_LABEL);
            ctx.stats.git_history_migrated = false;
            return Ok(());
        }

        state.begin(MigrationStep::TransferGitHistory);

        let snapshot = ctx
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::Migration("source data was not exported".to_string()))?;
        let target_repo = ctx
            .target_repo
            .as_ref()
            .ok_or_else(|| Error::Migration("target repository was not provisioned".to_string()))?;

        let mut migrator = GitMigrator::new(self.config.git.operation_timeout);
        migrator
            .transfer(&TransferRequest {
                source_clone_url: snapshot.repository.clone_url.clone(),
                source_credential: GitCredential::token(
                    self.config.source.personal_access_token.clone(),
                ),
                target_clone_url: target_repo.clone_url.clone(),
                target_credential: GitCredential::username(self.config.target.token.clone()),
                dry_run: opts.dry_run,
                verify_remote: opts.verify_remote,
            })
            .await?;

        ctx.verification = migrator.last_verification().cloned();
        ctx.stats.git_history_migrated = !opts.dry_run;
        state.complete();
        Ok(())
    }

    async fn convert_pipelines(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
        ctx: &mut RunContext,
    ) -> Result<()> {
        state.begin(MigrationStep::ConvertPipelines);

        if !spec.migrate_pipelines {
            info!("pipeline conversion skipped on request");
            state.complete();
            return Ok(());
        }

        // Conversion problems are reported but never abort a migration whose
        // history and work items can still land.
        if let Err(e) = self.convert_pipelines_inner(spec, opts, ctx).await {
            warn!(error = %e, "pipeline conversion incomplete");
        }

        state.complete();
        Ok(())
    }

    async fn convert_pipelines_inner(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        ctx: &mut RunContext,
    ) -> Result<()> {
        let snapshot = ctx
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::Migration("source data was not exported".to_string()))?;
        if snapshot.pipelines.is_empty() {
            info!("no pipelines to convert");
            return Ok(());
        }

        let generated_dir = self
            .config
            .output
            .directory
            .join("workflows")
            .join(spec.target_repo_name());

        let converter = PipelineConverter::new(self.config.pipelines.max_stem_length);
        let files = converter.convert_all(&snapshot.pipelines, &generated_dir, opts.dry_run)?;
        ctx.stats.pipelines_converted = files.len();

        if opts.dry_run || files.is_empty() {
            return Ok(());
        }

        if !opts.allow_local_workflows && looks_like_tool_source_tree(Path::new(".")) {
            warn!(
                "working directory looks like this tool's own source tree, \
                 not publishing workflows (use --allow-local-workflows to override)"
            );
            return Ok(());
        }

        let target_repo = ctx
            .target_repo
            .as_ref()
            .ok_or_else(|| Error::Migration("target repository was not provisioned".to_string()))?;
        let credential = GitCredential::username(self.config.target.token.clone());
        let authenticated =
            crate::git::authenticated_url(&target_repo.clone_url, &credential)?;
        publish_workflows(
            &authenticated,
            &target_repo.html_url,
            &generated_dir,
            &files,
            &credential.secrets(),
        )
        .await
    }

    async fn replicate_work_items(
        &self,
        spec: &MigrationTarget,
        opts: &RunOptions,
        state: &mut MigrationState,
        ctx: &mut RunContext,
    ) -> Result<()> {
        state.begin(MigrationStep::ReplicateWorkItems);

        if !spec.migrate_issues {
            info!("work item replication skipped on request");
            state.complete();
            return Ok(());
        }

        let snapshot = ctx
            .snapshot
            .as_ref()
            .ok_or_else(|| Error::Migration("source data was not exported".to_string()))?;

        if let Some(reason) = &snapshot.work_items_error {
            warn!(reason = %reason, "work items were not exported, nothing to replicate");
            state.complete();
            return Ok(());
        }

        if opts.dry_run {
            info!(
                count = snapshot.work_items.len(),
                "dry run, issues not created"
            );
            ctx.stats.work_items_migrated = snapshot.work_items.len();
            state.complete();
            return Ok(());
        }

        let repo = spec.target_repo_name();
        for item in &snapshot.work_items {
            let title = workitem::issue_title(item);
            let body = workitem::issue_body(item);
            let labels = workitem::issue_labels(item);
            match self.target.create_issue(repo, &title, &body, &labels).await {
                Ok(number) => {
                    info!(work_item = item.id, issue = number, "issue created");
                    ctx.stats.work_items_migrated += 1;
                }
                Err(e) => {
                    warn!(work_item = item.id, error = %e, "issue creation failed");
                    ctx.stats.work_item_failures += 1;
                }
            }
        }

        info!(
            migrated = ctx.stats.work_items_migrated,
            failed = ctx.stats.work_item_failures,
            "work item replication finished"
        );
        state.complete();
        Ok(())
    }
}

// The generated-workflow publish step must never commit into a checkout of
// this tool itself, which is easy to hit when testing against a local path.
fn looks_like_tool_source_tree(dir: &Path) -> bool {
    dir.join("Cargo.toml").exists() && dir.join("ferry-core").is_dir()
}
