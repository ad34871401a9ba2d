//! Core types for reconciliation.

use serde::{Deserialize, Serialize};

/// Observed state of a resource, produced by a read-only probe
/// immediately before the apply step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbedState {
    /// Resource does not exist
    Absent,
    /// Resource exists
    Present {
        /// Whether the live configuration differs from the declared one
        diverging: bool,
        /// Human-readable note about what was observed
        detail: Option<String>,
    },
}

impl ProbedState {
    /// Present and matching the declared configuration.
    pub fn present() -> Self {
        Self::Present {
            diverging: false,
            detail: None,
        }
    }

    /// Present but differing from the declared configuration.
    pub fn diverging(detail: impl Into<String>) -> Self {
        Self::Present {
            diverging: true,
            detail: Some(detail.into()),
        }
    }

    /// Check if the resource exists.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }
}

/// What to do when a probe finds the resource already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentPolicy {
    /// Leave it alone, even when diverging (the default)
    #[default]
    Skip,
    /// Delete and recreate when diverging, so the applied configuration
    /// always reflects the latest resolved outputs; never patch in place
    Replace,
}

/// Result of reconciling one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    /// Resource was created (for replace policy: deleted, then created)
    Created,
    /// Resource already existed and was left untouched
    SkippedAlreadyPresent,
    /// Apply failed on a best-effort declaration; the run continued
    Failed { reason: String },
}

impl ApplyOutcome {
    /// Check if this outcome represents success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Report for one reconciled declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Logical name of the declaration
    pub name: String,
    /// Resource kind (e.g. "function", "channel")
    pub kind: String,
    /// What happened
    pub outcome: ApplyOutcome,
}

/// Summary of a full reconciliation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per reconciled declaration, in execution order
    pub steps: Vec<StepReport>,
    /// Warnings accumulated during the run (divergence, best-effort
    /// failures); printed at the end, never change the exit code
    pub warnings: Vec<String>,
}

impl RunReport {
    /// Number of resources created.
    pub fn created(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == ApplyOutcome::Created)
            .count()
    }

    /// Number of resources skipped because they already existed.
    pub fn skipped(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == ApplyOutcome::SkippedAlreadyPresent)
            .count()
    }

    /// Number of best-effort declarations that failed.
    pub fn failed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| !s.outcome.is_success())
            .count()
    }

    /// Outcome recorded for a declaration, if it was reached.
    pub fn outcome_of(&self, name: &str) -> Option<&ApplyOutcome> {
        self.steps.iter().find(|s| s.name == name).map(|s| &s.outcome)
    }
}
