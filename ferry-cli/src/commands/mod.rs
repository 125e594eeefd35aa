//! CLI command implementations

pub mod analyze;
pub mod batch;
pub mod list;
pub mod migrate;
pub mod validate;

pub use analyze::AnalyzeArgs;
pub use batch::BatchArgs;
pub use list::ListArgs;
pub use migrate::MigrateArgs;
pub use validate::ValidateArgs;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use ferry_core::{Config, MigrationOrchestrator, RateLimiter};
use ferry_devops::DevOpsClient;
use ferry_github::GitHubClient;

use crate::env_subst;

/// Load and validate configuration, resolving `${VAR}` placeholders from the
/// environment first.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_config_path()
            .filter(|p| p.exists())
            .context(
                "no configuration file found; pass --config or create \
                 ~/.config/gitferry/config.toml",
            )?,
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    let resolved = env_subst::substitute(&raw)?;
    Ok(Config::parse(&resolved)?)
}

/// Build the source client from configuration.
pub(crate) fn build_source(config: &Config) -> anyhow::Result<DevOpsClient> {
    Ok(DevOpsClient::new(
        &config.source,
        config.retry.policy(),
        RateLimiter::new(config.rate_limit.calls_per_second),
    )?)
}

/// Wire both platform clients into an orchestrator.
pub(crate) fn build_orchestrator(config: Config) -> anyhow::Result<MigrationOrchestrator> {
    let source = build_source(&config)?;
    let target = GitHubClient::new(
        &config.target,
        config.retry.policy(),
        RateLimiter::new(config.rate_limit.calls_per_second),
    )?;
    Ok(MigrationOrchestrator::new(
        Arc::new(source),
        Arc::new(target),
        config,
    ))
}
