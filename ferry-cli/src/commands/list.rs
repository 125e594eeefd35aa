//! List command - Browse the source platform before migrating

use clap::{Args, Subcommand};

use ferry_core::model::PipelineScope;
use ferry_core::{Config, SourcePlatform};

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(subcommand)]
    pub what: ListCommand,
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// List projects in the source organization
    Projects,

    /// List repositories in a project
    Repos {
        /// Project to list repositories for
        #[arg(short, long)]
        project: String,
    },

    /// List build pipelines in a project
    Pipelines {
        /// Project to list pipelines for
        #[arg(short, long)]
        project: String,
    },
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let source = super::build_source(&config)?;

        match &self.what {
            ListCommand::Projects => {
                let projects = source.list_projects().await?;
                println!("Projects ({}):", projects.len());
                for project in projects {
                    match project.description.as_deref() {
                        Some(desc) => println!("  {}  - {}", project.name, desc),
                        None => println!("  {}", project.name),
                    }
                }
            }
            ListCommand::Repos { project } => {
                let repos = source.list_repositories(project).await?;
                println!("Repositories in {} ({}):", project, repos.len());
                for repo in repos {
                    println!(
                        "  {}  [default branch: {}]",
                        repo.name,
                        repo.default_branch.as_deref().unwrap_or("(none)")
                    );
                }
            }
            ListCommand::Pipelines { project } => {
                let pipelines = source
                    .list_pipelines(project, "", PipelineScope::Project)
                    .await?;
                println!("Pipelines in {} ({}):", project, pipelines.len());
                for pipeline in pipelines {
                    let status = if pipeline.is_disabled() { "  (disabled)" } else { "" };
                    println!("  #{}  {}{}", pipeline.id, pipeline.name, status);
                }
            }
        }
        Ok(())
    }
}
