//! Repository provisioning

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use ferry_core::model::TargetRepository;
use ferry_core::naming::valid_repo_name;
use ferry_core::{Error, Result};

use crate::client::GitHubClient;

#[derive(Debug, Deserialize)]
pub(crate) struct GhRepository {
    pub name: String,
    pub clone_url: String,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl From<GhRepository> for TargetRepository {
    fn from(r: GhRepository) -> Self {
        TargetRepository {
            name: r.name,
            clone_url: r.clone_url,
            html_url: r.html_url,
            default_branch: r.default_branch,
        }
    }
}

impl GitHubClient {
    pub async fn repository_exists(&self, name: &str) -> Result<bool> {
        let owner = self.owner().await?.to_string();
        let url = self.api_url(&["repos", &owner, name])?;
        match self.get_status(url).await? {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(crate::client::classify_status(status, "")),
        }
    }

    pub async fn get_repository(&self, name: &str) -> Result<Option<TargetRepository>> {
        let owner = self.owner().await?.to_string();
        let url = self.api_url(&["repos", &owner, name])?;
        match self.get_json::<GhRepository>(url).await {
            Ok(repo) => Ok(Some(repo.into())),
            Err(Error::Migration(msg)) if msg.contains("404") => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a repository, reusing an existing one with the same name.
    ///
    /// Names are validated up front and never rewritten; a name the target
    /// would mangle is the operator's problem to resolve.
    pub async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<TargetRepository> {
        if !valid_repo_name(name) {
            return Err(Error::Migration(format!(
                "invalid target repository name: {:?}",
                name
            )));
        }

        let url = match &self.organization {
            Some(org) => self.api_url(&["orgs", org, "repos"])?,
            None => self.api_url(&["user", "repos"])?,
        };
        let body = serde_json::json!({
            "name": name,
            "description": description.unwrap_or(""),
            "private": private,
        });

        let err = match self.post_json::<GhRepository>(url, body).await {
            Ok(repo) => {
                info!(repo = %repo.html_url, "target repository created");
                return Ok(repo.into());
            }
            Err(e) => e,
        };

        // 422 means the name is taken; 403 covers the case where the token
        // cannot create repositories but the repository is already there.
        // Both resolve to reuse when the repository turns out to be readable.
        if creation_may_be_conflict(&err) {
            if let Some(existing) = self.get_repository(name).await? {
                warn!(repo = name, "target repository already exists, reusing it");
                return Ok(existing);
            }
        }
        Err(err)
    }
}

fn creation_may_be_conflict(err: &Error) -> bool {
    matches!(
        err,
        Error::Migration(msg) if msg.contains("already exists") || msg.contains("403")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection_covers_422_and_403() {
        let taken = Error::Migration(
            "target request failed with 422 Unprocessable Entity: name already exists".to_string(),
        );
        let forbidden = Error::Migration(
            "target request failed with 403 Forbidden: insufficient permission".to_string(),
        );
        assert!(creation_may_be_conflict(&taken));
        assert!(creation_may_be_conflict(&forbidden));
    }

    #[test]
    fn test_other_errors_are_not_conflicts() {
        assert!(!creation_may_be_conflict(&Error::Migration(
            "target request failed with 404 Not Found: missing".to_string()
        )));
        assert!(!creation_may_be_conflict(&Error::Auth(
            "target platform rejected the token (401 Unauthorized)".to_string()
        )));
        assert!(!creation_may_be_conflict(&Error::Http(
            "target platform error 502 Bad Gateway: upstream".to_string()
        )));
    }
}
