//! Work item to issue mapping

use crate::markdown::html_to_markdown;
use crate::model::WorkItem;

/// Upper bound on an issue body accepted by the target platform
pub const MAX_ISSUE_BODY: usize = 65536;

/// Title for the replicated issue
pub fn issue_title(item: &WorkItem) -> String {
    if item.title.trim().is_empty() {
        format!("Migrated work item #{}", item.id)
    } else {
        item.title.clone()
    }
}

/// Issue body embedding the original identifier, type, state and converted
/// description
pub fn issue_body(item: &WorkItem) -> String {
    let mut parts = Vec::new();

    parts.push(format!("**Migrated from work item #{}**", item.id));
    parts.push(String::new());
    parts.push(format!("**Original type:** {}", item.item_type));
    parts.push(format!("**Original state:** {}", item.state));
    if let Some(assignee) = &item.assignee {
        parts.push(format!("**Assigned to:** {}", assignee));
    }
    if let Some(priority) = item.priority {
        parts.push(format!("**Priority:** {}", priority));
    }
    if let Some(created) = item.created {
        parts.push(format!("**Created:** {}", created.format("%Y-%m-%d %H:%M:%S")));
    }

    if let Some(description) = item.description.as_deref() {
        let converted = html_to_markdown(description);
        if !converted.is_empty() {
            parts.push(String::new());
            parts.push("## Description".to_string());
            parts.push(converted);
        }
    }

    truncate_body(&parts.join("\n"))
}

/// Standard labels for a replicated issue
pub fn issue_labels(item: &WorkItem) -> Vec<String> {
    let mut labels = vec!["migrated".to_string()];

    if !item.item_type.is_empty() {
        labels.push(format!("type:{}", slug(&item.item_type)));
    }
    if !item.state.is_empty() {
        labels.push(format!("state:{}", slug(&item.state)));
    }
    if let Some(priority) = item.priority {
        labels.push(format!("priority:{}", priority));
    }
    if let Some(area_path) = item.area_path.as_deref() {
        // Only the leaf of a hierarchical area path is useful as a label
        if let Some(area) = area_path.rsplit('\\').next() {
            if !area.is_empty() && area_path.contains('\\') {
                labels.push(format!("area:{}", slug(area)));
            }
        }
    }

    labels
}

fn slug(value: &str) -> String {
    value.to_lowercase().replace(' ', "-")
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ISSUE_BODY {
        return body.to_string();
    }
    let mut cut = MAX_ISSUE_BODY - 100;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n\n... [content truncated due to length limits] ...", &body[..cut])
}
