//! Post-transfer mirror verification

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use git2::{BranchType, Repository};
use tracing::warn;

use crate::git::transfer::run_git;
use crate::model::{RemoteComparison, VerificationResult};
use crate::Result;

const LS_REMOTE_TIMEOUT: Duration = Duration::from_secs(120);

/// Branch names and total commit count of a local bare mirror
pub fn local_mirror_stats(path: &Path) -> Result<(Vec<String>, usize)> {
    let repo = Repository::open_bare(path)?;

    let mut branch_names = Vec::new();
    for branch in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = branch?;
        if let Some(name) = branch.name()? {
            branch_names.push(name.to_string());
        }
    }
    branch_names.sort();

    let mut revwalk = repo.revwalk()?;
    revwalk.push_glob("refs/*")?;
    let commit_count = revwalk.filter_map(|oid| oid.ok()).count();

    Ok((branch_names, commit_count))
}

/// Verify a freshly pushed mirror.
///
/// Local stats come from the bare clone on disk. When `remote_url` is given
/// the remote branch list is fetched with `ls-remote` and compared; any
/// asymmetry is recorded on the result, not treated as an error.
pub async fn verify_mirror(
    path: &Path,
    remote_url: Option<&str>,
    secrets: &[String],
) -> Result<VerificationResult> {
    let (local_branch_names, commit_count) = local_mirror_stats(path)?;

    let remote = match remote_url {
        Some(url) => match list_remote_branches(url, secrets).await {
            Ok(remote_branches) => Some(compare_branch_sets(&local_branch_names, &remote_branches)),
            Err(e) => {
                warn!(error = %e, "remote branch listing failed, skipping comparison");
                None
            }
        },
        None => None,
    };

    Ok(VerificationResult {
        local_branch_count: local_branch_names.len(),
        local_branch_names,
        commit_count,
        remote,
    })
}

async fn list_remote_branches(url: &str, secrets: &[String]) -> Result<Vec<String>> {
    let output = run_git(
        &["ls-remote", "--heads", url],
        None,
        LS_REMOTE_TIMEOUT,
        secrets,
    )
    .await?;
    Ok(parse_ls_remote(&output))
}

fn parse_ls_remote(output: &str) -> Vec<String> {
    let mut branches: Vec<String> = output
        .lines()
        .filter_map(|line| line.split('\t').nth(1))
        .filter_map(|r| r.strip_prefix("refs/heads/"))
        .map(|name| name.to_string())
        .collect();
    branches.sort();
    branches
}

fn compare_branch_sets(local: &[String], remote: &[String]) -> RemoteComparison {
    let local_set: BTreeSet<&str> = local.iter().map(String::as_str).collect();
    let remote_set: BTreeSet<&str> = remote.iter().map(String::as_str).collect();

    let missing_on_remote: Vec<String> = local_set
        .difference(&remote_set)
        .map(|s| s.to_string())
        .collect();
    let missing_locally: Vec<String> = remote_set
        .difference(&local_set)
        .map(|s| s.to_string())
        .collect();

    if !missing_on_remote.is_empty() || !missing_locally.is_empty() {
        warn!(
            missing_on_remote = missing_on_remote.len(),
            missing_locally = missing_locally.len(),
            "branch sets differ between mirror and remote"
        );
    }

    RemoteComparison {
        remote_branch_count: remote.len(),
        remote_branch_names: remote.to_vec(),
        branches_match: missing_on_remote.is_empty() && missing_locally.is_empty(),
        missing_on_remote,
        missing_locally,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_remote() {
        let output = "abc123\trefs/heads/main\ndef456\trefs/heads/feature/x\nffff00\trefs/tags/v1\n";
        assert_eq!(parse_ls_remote(output), vec!["feature/x", "main"]);
    }

    #[test]
    fn test_parse_ls_remote_empty() {
        assert!(parse_ls_remote("").is_empty());
    }

    #[test]
    fn test_compare_matching_sets() {
        let local = vec!["dev".to_string(), "main".to_string()];
        let cmp = compare_branch_sets(&local, &local);
        assert!(cmp.branches_match);
        assert!(cmp.missing_on_remote.is_empty());
        assert!(cmp.missing_locally.is_empty());
    }

    #[test]
    fn test_compare_asymmetric_sets() {
        let local = vec!["a".to_string(), "b".to_string()];
        let remote = vec!["b".to_string(), "c".to_string()];
        let cmp = compare_branch_sets(&local, &remote);
        assert!(!cmp.branches_match);
        assert_eq!(cmp.missing_on_remote, vec!["a"]);
        assert_eq!(cmp.missing_locally, vec!["c"]);
    }

    #[test]
    fn test_branch_missing_on_remote() {
        let local = vec!["dev".to_string(), "main".to_string()];
        let remote = vec!["main".to_string()];
        let cmp = compare_branch_sets(&local, &remote);
        assert!(!cmp.branches_match);
        assert_eq!(cmp.missing_on_remote, vec!["dev"]);
        assert!(cmp.missing_locally.is_empty());
    }

    #[test]
    fn test_local_stats_on_fresh_bare_repo() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();
        let (branches, commits) = local_mirror_stats(dir.path()).unwrap();
        assert!(branches.is_empty());
        assert_eq!(commits, 0);
    }
}
