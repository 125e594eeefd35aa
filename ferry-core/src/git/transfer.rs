//! Mirror-based history transfer
//!
//! One transfer is clone `--mirror` from the source, push `--mirror` to the
//! target, verify, clean up. The system `git` binary does the heavy lifting;
//! every invocation runs under a timeout and credentials are redacted from
//! anything that can surface in logs or errors.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::git::auth::{authenticated_url, sanitize_clone_url, GitCredential};
use crate::git::verify::verify_mirror;
use crate::model::VerificationResult;
use crate::{Error, Result};

/// Run a git subprocess, capturing output and enforcing a timeout.
///
/// `secrets` are replaced with `***` in any text that escapes this function.
pub(crate) async fn run_git(
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
    secrets: &[String],
) -> Result<String> {
    let verb = args.first().copied().unwrap_or("git");
    debug!(verb, "running git subprocess");

    let mut command = Command::new("git");
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| {
            Error::Git(format!(
                "git {} timed out after {}s",
                verb,
                timeout.as_secs()
            ))
        })?
        .map_err(|e| Error::Git(format!("failed to spawn git {}: {}", verb, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let detail = redact(&format!("{}\n{}", stderr.trim(), stdout.trim()), secrets);
        return Err(Error::Git(format!(
            "git {} failed ({}): {}",
            verb,
            output.status,
            detail.trim()
        )));
    }

    Ok(redact(&stdout, secrets))
}

/// Replace each secret with `***`
pub(crate) fn redact(text: &str, secrets: &[String]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        if !secret.is_empty() {
            out = out.replace(secret.as_str(), "***");
        }
    }
    out
}

/// A bare mirror working directory with retried cleanup.
///
/// Dropping the value removes the directory as a backstop; callers should
/// prefer [`TemporaryMirror::remove`] so cleanup failures get logged from a
/// known point.
#[derive(Debug)]
pub struct TemporaryMirror {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TemporaryMirror {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("git-mirror-").tempdir()?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for the bare clone inside the temporary directory
    pub fn clone_path(&self) -> PathBuf {
        self.path.join("mirror.git")
    }

    /// Remove the directory, retrying briefly before giving up.
    ///
    /// A directory that survives all attempts is logged and leaked rather
    /// than failing the migration.
    pub async fn remove(mut self) {
        let path = self.path.clone();
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => return,
                Err(e) => warn!(path = %path.display(), error = %e, "mirror cleanup failed, retrying"),
            }
        }
        for attempt in 1..=2u32 {
            tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => return,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    warn!(path = %path.display(), attempt, error = %e, "mirror cleanup retry failed");
                }
            }
        }
        warn!(path = %path.display(), "leaving temporary mirror behind after failed cleanup");
    }
}

/// Inputs for one history transfer
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source_clone_url: String,
    pub source_credential: GitCredential,
    pub target_clone_url: String,
    pub target_credential: GitCredential,
    pub dry_run: bool,
    pub verify_remote: bool,
}

/// Transfers full git history between hosting platforms.
#[derive(Debug)]
pub struct GitMigrator {
    timeout: Duration,
    last_verification: Option<VerificationResult>,
}

impl GitMigrator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_verification: None,
        }
    }

    /// Verification gathered by the most recent [`GitMigrator::transfer`]
    pub fn last_verification(&self) -> Option<&VerificationResult> {
        self.last_verification.as_ref()
    }

    /// Confirm the system git binary is present and runnable
    pub async fn check_git_available(&self) -> Result<String> {
        let out = run_git(&["--version"], None, Duration::from_secs(10), &[]).await?;
        Ok(out.trim().to_string())
    }

    /// Mirror the source repository into the target.
    ///
    /// The temporary mirror is cleaned up on success and on failure.
    /// Verification problems are logged but never fail a completed push.
    pub async fn transfer(&mut self, request: &TransferRequest) -> Result<()> {
        self.last_verification = None;

        if request.source_clone_url.trim().is_empty() {
            return Err(Error::Git(
                "source repository has no clone url".to_string(),
            ));
        }

        let source_display = sanitize_clone_url(&request.source_clone_url);
        let target_display = sanitize_clone_url(&request.target_clone_url);

        if request.dry_run {
            info!(
                source = %source_display,
                target = %target_display,
                "dry run, skipping git history transfer"
            );
            return Ok(());
        }

        let mut secrets = request.source_credential.secrets();
        secrets.extend(request.target_credential.secrets());

        let source_url = authenticated_url(&request.source_clone_url, &request.source_credential)?;
        let target_url = authenticated_url(&request.target_clone_url, &request.target_credential)?;

        let mirror = TemporaryMirror::create()?;
        let clone_path = mirror.clone_path();
        let clone_path_str = clone_path.to_string_lossy().into_owned();

        let result = self
            .clone_and_push(
                &source_url,
                &target_url,
                &clone_path,
                &clone_path_str,
                &secrets,
            )
            .await;

        if result.is_ok() {
            match verify_mirror(
                &clone_path,
                request.verify_remote.then_some(target_url.as_str()),
                &secrets,
            )
            .await
            {
                Ok(verification) => {
                    info!(
                        branches = verification.local_branch_count,
                        commits = verification.commit_count,
                        "mirror verified"
                    );
                    self.last_verification = Some(verification);
                }
                Err(e) => warn!(error = %e, "mirror verification failed"),
            }
        }

        mirror.remove().await;
        result?;

        info!(source = %source_display, target = %target_display, "git history transferred");
        Ok(())
    }

    async fn clone_and_push(
        &self,
        source_url: &str,
        target_url: &str,
        clone_path: &Path,
        clone_path_str: &str,
        secrets: &[String],
    ) -> Result<()> {
        info!("cloning source repository as a mirror");
        run_git(
            &["clone", "--mirror", source_url, clone_path_str],
            None,
            self.timeout,
            secrets,
        )
        .await?;

        info!("pushing mirror to target repository");
        run_git(
            &["push", "--mirror", target_url],
            Some(clone_path),
            self.timeout,
            secrets,
        )
        .await?;

        Ok(())
    }
}
