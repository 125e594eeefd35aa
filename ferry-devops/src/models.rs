//! Azure DevOps REST API response shapes
//!
//! These mirror the wire format of the 7.0 REST API and convert into the
//! platform-neutral types the migration engine works with.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use ferry_core::model::{Pipeline, Project, PullRequest, Repository, WorkItem};

/// Standard list envelope used by most list endpoints
#[derive(Debug, Deserialize)]
pub struct ValueList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl From<AdoProject> for Project {
    fn from(p: AdoProject) -> Self {
        Project {
            id: p.id,
            name: p.name,
            description: p.description,
            state: p.state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl From<AdoRepository> for Repository {
    fn from(r: AdoRepository) -> Self {
        Repository {
            id: r.id,
            name: r.name,
            clone_url: r.remote_url.unwrap_or_default(),
            // Wire format is "refs/heads/main"
            default_branch: r
                .default_branch
                .map(|b| b.strip_prefix("refs/heads/").map(str::to_string).unwrap_or(b)),
            size_hint: r.size.unwrap_or(0),
            description: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdoRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoPullRequest {
    pub pull_request_id: u64,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub source_ref_name: Option<String>,
    #[serde(default)]
    pub target_ref_name: Option<String>,
}

impl From<AdoPullRequest> for PullRequest {
    fn from(pr: AdoPullRequest) -> Self {
        PullRequest {
            id: pr.pull_request_id,
            title: pr.title,
            status: pr.status,
            source_branch: pr.source_ref_name.map(strip_heads),
            target_branch: pr.target_ref_name.map(strip_heads),
        }
    }
}

pub fn strip_heads(r: String) -> String {
    r.strip_prefix("refs/heads/")
        .map(str::to_string)
        .unwrap_or(r)
}

/// WIQL query response: work item references only, details come from a
/// second call
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlResponse {
    #[serde(default = "Vec::new")]
    pub work_items: Vec<WiqlRef>,
}

#[derive(Debug, Deserialize)]
pub struct WiqlRef {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct AdoWorkItem {
    pub id: u64,
    pub fields: AdoWorkItemFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdoWorkItemFields {
    #[serde(rename = "System.WorkItemType", default)]
    pub item_type: Option<String>,
    #[serde(rename = "System.State", default)]
    pub state: Option<String>,
    #[serde(rename = "System.Title", default)]
    pub title: Option<String>,
    #[serde(rename = "System.Description", default)]
    pub description: Option<String>,
    #[serde(rename = "System.AssignedTo", default)]
    pub assigned_to: Option<AssignedTo>,
    #[serde(rename = "Microsoft.VSTS.Common.Priority", default)]
    pub priority: Option<i64>,
    #[serde(rename = "System.AreaPath", default)]
    pub area_path: Option<String>,
    #[serde(rename = "System.CreatedDate", default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// Older API versions return the assignee as a plain string, newer ones as
/// an identity object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AssignedTo {
    Identity {
        #[serde(rename = "displayName")]
        display_name: String,
    },
    Name(String),
}

impl AssignedTo {
    pub fn display_name(&self) -> &str {
        match self {
            AssignedTo::Identity { display_name } => display_name,
            AssignedTo::Name(name) => name,
        }
    }
}

impl From<AdoWorkItem> for WorkItem {
    fn from(item: AdoWorkItem) -> Self {
        let fields = item.fields;
        WorkItem {
            id: item.id,
            item_type: fields.item_type.unwrap_or_default(),
            state: fields.state.unwrap_or_default(),
            title: fields.title.unwrap_or_default(),
            description: fields.description,
            assignee: fields.assigned_to.map(|a| a.display_name().to_string()),
            priority: fields.priority,
            area_path: fields.area_path,
            created: fields.created_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoPipeline {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub queue_status: Option<String>,
    #[serde(default)]
    pub repository: Option<AdoPipelineRepository>,
}

#[derive(Debug, Deserialize)]
pub struct AdoPipelineRepository {
    pub id: String,
}

impl From<AdoPipeline> for Pipeline {
    fn from(p: AdoPipeline) -> Self {
        Pipeline {
            id: p.id,
            name: p.name,
            queue_status: p.queue_status,
            repository_id: p.repository.map(|r| r.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_defaults() {
        let json = r#"{
            "id": "abc",
            "name": "svc",
            "remoteUrl": "https://dev.azure.com/org/proj/_git/svc",
            "defaultBranch": "refs/heads/main",
            "size": 1024
        }"#;
        let repo: Repository = serde_json::from_str::<AdoRepository>(json).unwrap().into();
        assert_eq!(repo.default_branch.as_deref(), Some("main"));
        assert_eq!(repo.size_hint, 1024);
    }

    #[test]
    fn test_work_item_field_mapping() {
        let json = r#"{
            "id": 7,
            "fields": {
                "System.WorkItemType": "Bug",
                "System.State": "Active",
                "System.Title": "Crash on save",
                "System.AssignedTo": {"displayName": "Dana Dev", "uniqueName": "dana@x"},
                "Microsoft.VSTS.Common.Priority": 1
            }
        }"#;
        let item: WorkItem = serde_json::from_str::<AdoWorkItem>(json).unwrap().into();
        assert_eq!(item.id, 7);
        assert_eq!(item.item_type, "Bug");
        assert_eq!(item.assignee.as_deref(), Some("Dana Dev"));
        assert_eq!(item.priority, Some(1));
    }

    #[test]
    fn test_assignee_plain_string() {
        let json = r#"{"id": 1, "fields": {"System.AssignedTo": "Old Style <old@x>"}}"#;
        let item: WorkItem = serde_json::from_str::<AdoWorkItem>(json).unwrap().into();
        assert_eq!(item.assignee.as_deref(), Some("Old Style <old@x>"));
    }

    #[test]
    fn test_pipeline_repository_binding() {
        let json = r#"{
            "id": 12,
            "name": "CI",
            "queueStatus": "enabled",
            "repository": {"id": "abc", "type": "TfsGit"}
        }"#;
        let pipeline: Pipeline = serde_json::from_str::<AdoPipeline>(json).unwrap().into();
        assert_eq!(pipeline.repository_id.as_deref(), Some("abc"));
        assert!(!pipeline.is_disabled());
    }

    #[test]
    fn test_empty_value_list() {
        let list: ValueList<AdoProject> = serde_json::from_str(r#"{"count": 0, "value": []}"#).unwrap();
        assert!(list.value.is_empty());
    }
}
