//! Migration step ledger
//!
//! Tracks which steps of a run completed and which one failed, so the final
//! report reflects exactly what happened even when a run aborts part way.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The ordered steps of one repository migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    ValidatePrerequisites,
    ExportSourceData,
    ProvisionTarget,
    TransferGitHistory,
    ConvertPipelines,
    ReplicateWorkItems,
    GenerateReport,
}

impl MigrationStep {
    /// Human-readable label recorded in the ledger and the report
    pub fn label(&self) -> &'static str {
        match self {
            MigrationStep::ValidatePrerequisites => "Validating prerequisites",
            MigrationStep::ExportSourceData => "Exporting source data",
            MigrationStep::ProvisionTarget => "Provisioning target repository",
            MigrationStep::TransferGitHistory => "Transferring git history",
            MigrationStep::ConvertPipelines => "Converting pipelines",
            MigrationStep::ReplicateWorkItems => "Replicating work items",
            MigrationStep::GenerateReport => "Generating report",
        }
    }
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ledger of one run's progress
#[derive(Debug, Clone, Serialize)]
pub struct MigrationState {
    pub started_at: DateTime<Utc>,
    /// Step currently in flight, if any
    pub current_step: Option<String>,
    pub completed_steps: Vec<String>,
    pub failed_steps: Vec<String>,
}

impl MigrationState {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
        }
    }

    /// Mark `step` as in flight
    pub fn begin(&mut self, step: MigrationStep) {
        self.current_step = Some(step.label().to_string());
    }

    /// Mark the in-flight step as completed
    pub fn complete(&mut self) {
        if let Some(step) = self.current_step.take() {
            self.completed_steps.push(step);
        }
    }

    /// Mark the in-flight step as failed
    pub fn fail_current(&mut self) {
        if let Some(step) = self.current_step.take() {
            self.failed_steps.push(step);
        }
    }

    /// Record a step that was resolved without running, such as an
    /// explicitly skipped transfer
    pub fn note_completed(&mut self, label: impl Into<String>) {
        self.completed_steps.push(label.into());
    }

    /// Seconds elapsed since the run started
    pub fn elapsed_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for MigrationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_moves_current_step() {
        let mut state = MigrationState::new();
        state.begin(MigrationStep::ExportSourceData);
        assert_eq!(state.current_step.as_deref(), Some("Exporting source data"));
        state.complete();
        assert!(state.current_step.is_none());
        assert_eq!(state.completed_steps, vec!["Exporting source data"]);
        assert!(state.failed_steps.is_empty());
    }

    #[test]
    fn test_fail_moves_current_step() {
        let mut state = MigrationState::new();
        state.begin(MigrationStep::TransferGitHistory);
        state.fail_current();
        assert!(state.current_step.is_none());
        assert_eq!(state.failed_steps, vec!["Transferring git history"]);
        assert!(state.completed_steps.is_empty());
    }

    #[test]
    fn test_note_completed_records_label() {
        let mut state = MigrationState::new();
        state.note_completed("Skipped git history (no-git)");
        assert_eq!(state.completed_steps, vec!["Skipped git history (no-git)"]);
    }

    #[test]
    fn test_complete_without_begin_is_noop() {
        let mut state = MigrationState::new();
        state.complete();
        state.fail_current();
        assert!(state.completed_steps.is_empty());
        assert!(state.failed_steps.is_empty());
    }
}
