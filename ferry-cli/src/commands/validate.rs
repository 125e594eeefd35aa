//! Validate command - Check credentials and local tooling before a migration

use clap::Args;

use ferry_core::git::GitMigrator;
use ferry_core::Config;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let git_timeout = config.git.operation_timeout;
        let orchestrator = super::build_orchestrator(config)?;

        println!("Validating migration prerequisites");
        println!("==================================");

        orchestrator.validate_credentials().await?;
        println!("  source credentials: ok");
        println!("  target credentials: ok");

        match GitMigrator::new(git_timeout).check_git_available().await {
            Ok(version) => println!("  git binary: {}", version),
            Err(e) => {
                println!("  git binary: NOT AVAILABLE ({})", e);
                println!("  (history transfer will fail; metadata-only runs still work)");
            }
        }

        println!();
        println!("Ready to migrate.");
        Ok(())
    }
}
