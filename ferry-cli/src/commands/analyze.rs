//! Analyze command - Survey the source organization and plan migrations

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use ferry_core::analysis::{analyze_organization, OrganizationAnalysis};
use ferry_core::Config;

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Analyze a single project instead of the whole organization
    #[arg(short, long)]
    pub project: Option<String>,

    /// Analysis report format
    #[arg(long, value_parser = ["json", "csv"], default_value = "json")]
    pub format: String,

    /// Also write a migration plan usable with `ferry batch --plan`
    #[arg(long)]
    pub create_plan: bool,
}

impl AnalyzeArgs {
    /// Execute the analyze command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let source = super::build_source(&config)?;
        let analysis = analyze_organization(&source, self.project.as_deref()).await?;

        print_summary(&analysis);

        let output_dir = &config.output.directory;
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("could not create {}", output_dir.display()))?;
        let timestamp = analysis.generated_at.format("%Y%m%d_%H%M%S");
        let organization = &config.source.organization;

        let report_path = if self.format == "csv" {
            let path = output_dir.join(format!(
                "analysis_report_{}_{}.csv",
                organization, timestamp
            ));
            std::fs::write(&path, render_csv(&analysis))?;
            path
        } else {
            let path = output_dir.join(format!(
                "analysis_report_{}_{}.json",
                organization, timestamp
            ));
            std::fs::write(&path, serde_json::to_vec_pretty(&analysis)?)?;
            path
        };
        println!();
        println!("Analysis report written to {}", report_path.display());

        if self.create_plan {
            let plan = analysis.migration_plan();
            let plan_path: PathBuf = output_dir.join(format!(
                "migration_plan_{}_{}.json",
                organization, timestamp
            ));
            std::fs::write(&plan_path, serde_json::to_vec_pretty(&plan)?)?;
            println!(
                "Migration plan ({} repositories) written to {}",
                plan.len(),
                plan_path.display()
            );
            println!("Run it with: ferry batch --plan {}", plan_path.display());
        }

        Ok(())
    }
}

fn print_summary(analysis: &OrganizationAnalysis) {
    println!("Organization Analysis");
    println!("=====================");
    println!("Projects analyzed: {}", analysis.projects_analyzed);

    for project in &analysis.projects {
        println!();
        if let Some(error) = &project.error {
            println!("{}: NOT ANALYZABLE ({})", project.name, error);
            continue;
        }
        println!(
            "{}: {} repositories, {} work items, {} pull requests",
            project.name,
            project.repositories_count,
            project.work_items_count,
            project.total_pull_requests
        );
        for repo in &project.repositories {
            if let Some(error) = &repo.error {
                println!("  {}  (not analyzable: {})", repo.name, error);
                continue;
            }
            print!(
                "  {}  priority: {}  effort: {}  PRs: {}",
                repo.name, repo.priority, repo.effort, repo.pull_requests_count
            );
            if repo.notes.is_empty() {
                println!();
            } else {
                println!("  [{}]", repo.notes.join("; "));
            }
        }
    }
}

fn render_csv(analysis: &OrganizationAnalysis) -> String {
    let mut out = String::from(
        "project_name,repo_name,repo_size,pull_requests_count,work_items_count,\
         is_empty,migration_priority,estimated_effort\n",
    );
    for project in &analysis.projects {
        if project.error.is_some() {
            continue;
        }
        for repo in &project.repositories {
            if repo.error.is_some() {
                continue;
            }
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                csv_field(&project.name),
                csv_field(&repo.name),
                repo.size,
                repo.pull_requests_count,
                project.work_items_count,
                repo.is_empty,
                repo.priority,
                repo.effort
            ));
        }
    }
    out
}

// Quote only when the field needs it
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Utc;
    use ferry_core::analysis::{Effort, Priority, ProjectAnalysis, RepositoryAnalysis};

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("My Project"), "My Project");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_skips_errored_rows() {
        let analysis = OrganizationAnalysis {
            generated_at: Utc::now(),
            projects_analyzed: 1,
            projects: vec![ProjectAnalysis {
                name: "Proj".to_string(),
                id: "p1".to_string(),
                repositories_count: 2,
                work_items_count: 3,
                work_item_types: BTreeMap::new(),
                work_item_states: BTreeMap::new(),
                total_pull_requests: 4,
                repositories: vec![
                    RepositoryAnalysis {
                        name: "svc".to_string(),
                        id: "r1".to_string(),
                        size: 100,
                        default_branch: None,
                        pull_requests_count: 4,
                        is_empty: false,
                        priority: Priority::Low,
                        effort: Effort::Low,
                        notes: vec![],
                        error: None,
                    },
                    RepositoryAnalysis {
                        name: "broken".to_string(),
                        id: "r2".to_string(),
                        size: 0,
                        default_branch: None,
                        pull_requests_count: 0,
                        is_empty: true,
                        priority: Priority::Low,
                        effort: Effort::Low,
                        notes: vec![],
                        error: Some("403".to_string()),
                    },
                ],
                error: None,
            }],
        };

        let csv = render_csv(&analysis);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Proj,svc,100,4,3,false,low,low");
    }
}
