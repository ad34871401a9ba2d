//! Error taxonomy for reconciliation runs.
//!
//! The taxonomy separates "the remote state could not be determined"
//! from "the remote rejected the change" from "a precondition for the
//! run is not satisfied", because each propagates differently: probe
//! and precondition failures are always fatal, apply failures are fatal
//! only for required declarations.

use thiserror::Error;

/// Errors raised while reconciling a plan.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A read-only probe could not determine remote state.
    ///
    /// Never downgraded to "absent": creating on top of unknown state is
    /// how duplicates and half-configured resources happen.
    #[error("could not determine the state of {name}: {message}")]
    ProbeTransport {
        /// Logical name of the declaration being probed
        name: String,
        /// Detail from the failed call
        message: String,
    },

    /// A precondition for the run is not satisfied.
    #[error("{message}")]
    PreconditionUnmet {
        /// What is missing and why the run cannot proceed
        message: String,
        /// Exact commands the operator can run to fix it
        remediation: Vec<String>,
    },

    /// The remote rejected a create or delete.
    #[error("applying {name} failed: {message}")]
    ApplyFailure {
        /// Logical name of the declaration being applied
        name: String,
        /// Detail from the failed call
        message: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle involving {name}")]
    DependencyCycle {
        /// A declaration on the cycle
        name: String,
    },

    /// A declaration depends on a name that is not in the plan.
    #[error("{name} depends on {dependency}, which is not declared")]
    UnknownDependency {
        name: String,
        dependency: String,
    },

    /// A selection named a declaration that is not in the plan.
    #[error("no declaration named {name}")]
    UnknownDeclaration { name: String },

    /// Two declarations share a logical name.
    #[error("duplicate declaration name {name}")]
    DuplicateName { name: String },
}

impl ReconcileError {
    /// Probe failure for a named declaration.
    pub fn probe_transport(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ProbeTransport {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Apply failure for a named declaration.
    pub fn apply_failure(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ApplyFailure {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Precondition failure with remediation commands.
    pub fn precondition(message: impl Into<String>, remediation: Vec<String>) -> Self {
        Self::PreconditionUnmet {
            message: message.into(),
            remediation,
        }
    }

    /// Commands that would fix this error, if any.
    pub fn remediation(&self) -> &[String] {
        match self {
            Self::PreconditionUnmet { remediation, .. } => remediation,
            _ => &[],
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
