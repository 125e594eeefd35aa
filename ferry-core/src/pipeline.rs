//! Pipeline definition conversion
//!
//! Converts source CI pipeline definitions into GitHub Actions workflow
//! files and publishes them to the migrated repository. Conversion is
//! deliberately conservative: each generated workflow is a reviewed-by-hand
//! starting point carrying the original pipeline's identity, not a faithful
//! translation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::git::transfer::run_git;
use crate::model::Pipeline;
use crate::naming::StemSet;
use crate::{Error, Result};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(600);
const COMMIT_AUTHOR_NAME: &str = "gitferry";
const COMMIT_AUTHOR_EMAIL: &str = "gitferry@localhost";

/// Converts pipelines to workflow files on disk.
#[derive(Debug)]
pub struct PipelineConverter {
    max_stem_len: usize,
}

impl PipelineConverter {
    pub fn new(max_stem_len: usize) -> Self {
        Self {
            max_stem_len: max_stem_len.max(1),
        }
    }

    /// Convert every pipeline into a workflow file under `output_dir`.
    ///
    /// Returns the generated file names. A single failing pipeline is
    /// logged and skipped; the rest still convert. In dry-run mode the
    /// names are derived but nothing is written.
    pub fn convert_all(
        &self,
        pipelines: &[Pipeline],
        output_dir: &Path,
        dry_run: bool,
    ) -> Result<Vec<String>> {
        if pipelines.is_empty() {
            return Ok(Vec::new());
        }

        if !dry_run {
            std::fs::create_dir_all(output_dir)?;
        }

        let mut stems = StemSet::new(self.max_stem_len);
        let mut generated = Vec::new();

        for pipeline in pipelines {
            let file_name = format!("{}.yml", stems.derive(&pipeline.name));
            if dry_run {
                info!(pipeline = %pipeline.name, file = %file_name, "dry run, workflow not written");
                generated.push(file_name);
                continue;
            }

            match self.write_workflow(pipeline, output_dir, &file_name) {
                Ok(()) => {
                    info!(pipeline = %pipeline.name, file = %file_name, "workflow generated");
                    generated.push(file_name);
                }
                Err(e) => {
                    warn!(pipeline = %pipeline.name, error = %e, "skipping pipeline conversion");
                }
            }
        }

        Ok(generated)
    }

    // Write through a temporary file so a failure never leaves a partial
    // workflow behind.
    fn write_workflow(&self, pipeline: &Pipeline, output_dir: &Path, file_name: &str) -> Result<()> {
        let content = render_workflow(pipeline);
        let final_path = output_dir.join(file_name);
        let tmp_path = output_dir.join(format!("{}.tmp", file_name));
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

/// Render the workflow skeleton for one pipeline.
pub fn render_workflow(pipeline: &Pipeline) -> String {
    format!(
        r#"# Converted from pipeline "{name}" (id {id})
# Review and adjust before relying on this workflow.
name: {name}

on:
  push:
    branches: [main]
  pull_request:
    branches: [main]
  workflow_dispatch:

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - name: Build
        run: |
          echo "Replace with the build steps from pipeline '{name}'"
          exit 1
"#,
        name = pipeline.name,
        id = pipeline.id,
    )
}

/// Commit generated workflow files into the migrated repository.
///
/// Clones the repository into a temporary directory, copies the files into
/// `.github/workflows/` (suffixing `-migrated` on a name collision), commits
/// and pushes. An empty commit is not an error.
pub async fn publish_workflows(
    authenticated_repo_url: &str,
    display_url: &str,
    generated_dir: &Path,
    files: &[String],
    secrets: &[String],
) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }

    info!(repo = %display_url, count = files.len(), "publishing workflows");

    let checkout = tempfile::Builder::new()
        .prefix("workflow-publish-")
        .tempdir()?;
    let work_dir = checkout.path().join("repo");
    let work_dir_str = work_dir.to_string_lossy().into_owned();

    run_git(
        &["clone", "--depth", "1", authenticated_repo_url, &work_dir_str],
        None,
        PUBLISH_TIMEOUT,
        secrets,
    )
    .await?;

    let workflows_dir = work_dir.join(".github").join("workflows");
    std::fs::create_dir_all(&workflows_dir)?;

    for file in files {
        let source = generated_dir.join(file);
        let destination = collision_free_destination(&workflows_dir, file);
        std::fs::copy(&source, &destination)?;
    }

    run_git(&["add", ".github/workflows"], Some(&work_dir), PUBLISH_TIMEOUT, secrets).await?;

    let commit = run_git(
        &[
            "-c",
            &format!("user.name={}", COMMIT_AUTHOR_NAME),
            "-c",
            &format!("user.email={}", COMMIT_AUTHOR_EMAIL),
            "commit",
            "-m",
            "Add workflows converted from migrated pipelines",
        ],
        Some(&work_dir),
        PUBLISH_TIMEOUT,
        secrets,
    )
    .await;

    match commit {
        Ok(_) => {
            run_git(&["push"], Some(&work_dir), PUBLISH_TIMEOUT, secrets).await?;
            info!(repo = %display_url, "workflows published");
        }
        Err(Error::Git(message)) if message.contains("nothing to commit") => {
            info!(repo = %display_url, "workflows already present, nothing to publish");
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

fn collision_free_destination(workflows_dir: &Path, file_name: &str) -> PathBuf {
    let candidate = workflows_dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = file_name.strip_suffix(".yml").unwrap_or(file_name);
    workflows_dir.join(format!("{}-migrated.yml", stem))
}
