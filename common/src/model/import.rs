use crate::model::diagnostic::Diagnostic;
use crate::model::target::TargetRecord;
use serde::{Deserialize, Serialize};

/// Lifecycle of one import run.
///
/// A run moves forward only:
/// `Idle -> Parsing -> Validating -> ReadyToCommit -> Committing -> Done | Failed`.
/// `Parsing` may also end in `Failed`, `ReadyToCommit` may go straight to `Done`
/// when there is nothing to commit, and the caller may abandon a run at any
/// boundary before `Committing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportState {
    Idle,
    Parsing,
    Validating,
    ReadyToCommit,
    Committing,
    Done,
    Failed,
    Abandoned,
}

impl ImportState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportState::Done | ImportState::Failed | ImportState::Abandoned
        )
    }

    /// Whether a run in `self` may move to `next`.
    pub fn can_transition_to(&self, next: ImportState) -> bool {
        use ImportState::*;
        matches!(
            (self, next),
            (Idle, Parsing)
                | (Idle, Abandoned)
                | (Parsing, Validating)
                | (Parsing, Failed)
                | (Parsing, Abandoned)
                | (Validating, ReadyToCommit)
                | (Validating, Abandoned)
                | (ReadyToCommit, Done)
                | (ReadyToCommit, Committing)
                | (ReadyToCommit, Abandoned)
                | (Committing, Done)
                | (Committing, Failed)
        )
    }
}

/// Row counts of a validated file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Valid rows that still carry at least one warning.
    pub warned_rows: usize,
    pub rejected_rows: usize,
}

/// Everything validation learned about a file.
///
/// `valid` holds exactly one record per row without errors, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub valid: Vec<TargetRecord>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub summary: ImportSummary,
}

impl ImportResult {
    /// Result of a run that stopped before any row was validated.
    pub fn fatal(diagnostic: Diagnostic) -> Self {
        Self {
            errors: vec![diagnostic],
            ..Default::default()
        }
    }
}

/// What the store reported for a bulk create.
///
/// All-or-nothing: when `failure_reason` is set, `committed_records` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub committed_records: Vec<TargetRecord>,
    pub failure_reason: Option<String>,
}

impl CommitOutcome {
    pub fn committed(records: Vec<TargetRecord>) -> Self {
        Self {
            committed_records: records,
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            committed_records: Vec::new(),
            failure_reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure_reason.is_none()
    }
}

/// Terminal result of one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportOutcome {
    /// The run finished. `committed` is empty when no row was valid.
    Done {
        result: ImportResult,
        committed: Vec<TargetRecord>,
    },
    /// The run could not finish. `result` keeps whatever diagnostics were
    /// collected before the failure so they can still be shown.
    Failed { reason: String, result: ImportResult },
    /// The caller cancelled the run at the given state.
    Abandoned { at: ImportState },
}

impl ImportOutcome {
    pub fn state(&self) -> ImportState {
        match self {
            ImportOutcome::Done { .. } => ImportState::Done,
            ImportOutcome::Failed { .. } => ImportState::Failed,
            ImportOutcome::Abandoned { .. } => ImportState::Abandoned,
        }
    }

    pub fn result(&self) -> Option<&ImportResult> {
        match self {
            ImportOutcome::Done { result, .. } | ImportOutcome::Failed { result, .. } => {
                Some(result)
            }
            ImportOutcome::Abandoned { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_allowed() {
        let path = [
            ImportState::Idle,
            ImportState::Parsing,
            ImportState::Validating,
            ImportState::ReadyToCommit,
            ImportState::Committing,
            ImportState::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn states_are_never_reentered() {
        assert!(!ImportState::Validating.can_transition_to(ImportState::Parsing));
        assert!(!ImportState::Done.can_transition_to(ImportState::Idle));
        assert!(!ImportState::Parsing.can_transition_to(ImportState::Parsing));
    }

    #[test]
    fn committing_cannot_be_abandoned() {
        assert!(ImportState::ReadyToCommit.can_transition_to(ImportState::Abandoned));
        assert!(!ImportState::Committing.can_transition_to(ImportState::Abandoned));
    }

    #[test]
    fn validation_cannot_fail_the_run() {
        assert!(!ImportState::Validating.can_transition_to(ImportState::Failed));
    }
}
