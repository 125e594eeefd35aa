//! Batch command - Migrate a list of repositories from a plan file

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use ferry_core::{Config, MigrationTarget, RunOptions};

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON plan file listing the repositories to migrate
    #[arg(short, long, default_value = "migration_plan.json")]
    pub plan: PathBuf,

    /// Write a sample plan file and exit
    #[arg(long)]
    pub create_sample: bool,

    /// Log intent without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the git history transfer for every repository
    #[arg(long)]
    pub no_git: bool,

    /// After each push, compare remote branches against the local mirror
    #[arg(long)]
    pub verify_remote: bool,
}

impl BatchArgs {
    /// Execute the batch command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        if self.create_sample {
            return self.write_sample_plan();
        }

        let raw = std::fs::read_to_string(&self.plan)
            .with_context(|| format!("could not read plan file {}", self.plan.display()))?;
        let specs: Vec<MigrationTarget> =
            serde_json::from_str(&raw).context("plan file is not a valid migration plan")?;
        if specs.is_empty() {
            bail!("plan file {} lists no repositories", self.plan.display());
        }

        println!("Batch migration: {} repositories", specs.len());
        for spec in &specs {
            println!("  {}/{} -> {}", spec.project, spec.repo, spec.target_repo_name());
        }
        println!();

        let orchestrator = super::build_orchestrator(config)?;
        orchestrator.validate_credentials().await?;

        let opts = RunOptions {
            dry_run: self.dry_run,
            skip_git: self.no_git,
            verify_remote: self.verify_remote,
            ..Default::default()
        };

        let outcomes = tokio::select! {
            outcomes = orchestrator.migrate_batch(&specs, &opts) => outcomes,
            _ = tokio::signal::ctrl_c() => {
                bail!("interrupted, partial results are in the report directory");
            }
        };

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.report.source.repository.as_str())
            .collect();

        println!();
        println!(
            "Batch finished: {} succeeded, {} failed",
            outcomes.len() - failed.len(),
            failed.len()
        );
        if !failed.is_empty() {
            bail!("failed repositories: {}", failed.join(", "));
        }
        Ok(())
    }

    fn write_sample_plan(&self) -> anyhow::Result<()> {
        if self.plan.exists() {
            bail!("refusing to overwrite existing plan file {}", self.plan.display());
        }
        let sample = vec![
            MigrationTarget::new("MyProject", "service-api"),
            MigrationTarget {
                target_repo: Some("legacy-frontend".to_string()),
                migrate_pipelines: false,
                ..MigrationTarget::new("MyProject", "frontend")
            },
        ];
        std::fs::write(&self.plan, serde_json::to_vec_pretty(&sample)?)?;
        println!("Sample plan written to {}", self.plan.display());
        println!("Edit it, then run: ferry batch --plan {}", self.plan.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_round_trip() {
        let json = r#"[
            {"project": "Proj", "repo": "svc"},
            {"project": "Proj", "repo": "web", "target_repo": "web-app", "migrate_issues": false}
        ]"#;
        let specs: Vec<MigrationTarget> = serde_json::from_str(json).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs[0].migrate_issues);
        assert_eq!(specs[1].target_repo_name(), "web-app");
        assert!(!specs[1].migrate_issues);
    }
}
