//! Declarations: desired resources and the behavior to converge them.

use crate::context::RunContext;
use crate::error::{ReconcileError, Result};
use crate::types::{PresentPolicy, ProbedState};
use std::fmt;

/// Kind-specific behavior of a declared resource.
///
/// Implementations wrap the management-API calls for one resource kind:
/// a read-only probe, a create, optionally a delete (for replace policy),
/// and extraction of computed outputs. They never decide *whether* to
/// act; that is the executor's job.
pub trait Provision: Send + Sync + fmt::Debug {
    /// Resource kind (e.g. "identity", "channel", "function").
    fn kind(&self) -> &'static str;

    /// Human-readable description of the declared resource.
    fn describe(&self) -> String;

    /// Read-only existence/state check.
    ///
    /// Must return an error when state cannot be determined; never
    /// assume absent on a failed call.
    fn probe(&self, ctx: &RunContext) -> Result<ProbedState>;

    /// Create the resource with the declared configuration.
    fn create(&self, ctx: &RunContext) -> Result<()>;

    /// Delete the resource (only used by [`PresentPolicy::Replace`]).
    fn delete(&self, _ctx: &RunContext) -> Result<()> {
        Err(ReconcileError::apply_failure(
            self.describe(),
            "this resource kind does not support replacement",
        ))
    }

    /// What to do when the probe finds the resource present.
    fn on_present(&self) -> PresentPolicy {
        PresentPolicy::Skip
    }

    /// Computed outputs to record for later declarations.
    ///
    /// Consulted after `Created` and `SkippedAlreadyPresent`; may issue
    /// read-only calls (e.g. describe a deployed function for its URL).
    fn outputs(&self, _ctx: &RunContext) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

/// A precondition checked before guarded declarations are applied.
///
/// Preconditions have no create path: remediation is manual, and the
/// check's error names the exact commands to run.
pub trait Precondition: Send + Sync + fmt::Debug {
    /// Human-readable description of what is being checked.
    fn describe(&self) -> String;

    /// Verify the precondition, failing with
    /// [`ReconcileError::PreconditionUnmet`] when it does not hold.
    fn check(&self, ctx: &RunContext) -> Result<()>;
}

/// One desired resource: identity, dependencies, and behavior.
#[derive(Debug)]
pub struct Declaration {
    /// Logical name, unique within a plan (e.g. "function.extractor")
    pub name: String,
    /// Logical names this declaration must run after
    pub depends_on: Vec<String>,
    /// Whether failure to apply aborts the run (true) or only records a
    /// warning (false, "best-effort")
    pub required: bool,
    /// Kind-specific behavior
    pub provision: Box<dyn Provision>,
}

impl Declaration {
    /// Declare a required resource with no dependencies.
    pub fn new(name: impl Into<String>, provision: Box<dyn Provision>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            required: true,
            provision,
        }
    }

    /// Add dependencies by logical name.
    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.depends_on
            .extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Mark this declaration best-effort: failure logs a warning and the
    /// run continues.
    pub fn best_effort(mut self) -> Self {
        self.required = false;
        self
    }

    /// Resource kind, delegated to the provision.
    pub fn kind(&self) -> &'static str {
        self.provision.kind()
    }
}
