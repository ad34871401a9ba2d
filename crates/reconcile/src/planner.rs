//! Plans: one declaration list, plus gates, plus entry-point selection.

use crate::declaration::{Declaration, Precondition};
use crate::error::Result;
use crate::graph;

/// A precondition guarding a set of declarations.
///
/// The check runs once, immediately before the first guarded declaration
/// would be applied. If it fails, none of the guarded declarations (nor
/// anything after them) is attempted.
#[derive(Debug)]
pub struct Gate {
    /// Logical names of the declarations this gate guards
    pub guards: Vec<String>,
    /// The check itself
    pub precondition: Box<dyn Precondition>,
}

impl Gate {
    pub fn new(precondition: Box<dyn Precondition>, guards: &[&str]) -> Self {
        Self {
            guards: guards.iter().map(|g| (*g).to_string()).collect(),
            precondition,
        }
    }
}

/// An ordered set of declarations and their gates.
///
/// There is one plan per pipeline; "deploy", "repair", and
/// "redeploy-one" are selections over it, not separate scripts.
#[derive(Debug, Default)]
pub struct Plan {
    pub declarations: Vec<Declaration>,
    pub gates: Vec<Gate>,
}

impl Plan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration.
    pub fn add(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    /// Add a gate.
    pub fn add_gate(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// Number of declarations in the plan.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check if the plan has no declarations.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Restrict the plan to the named declarations and their transitive
    /// dependencies. Gates are kept if any guarded declaration survives.
    pub fn select(self, targets: &[String]) -> Result<Self> {
        if targets.is_empty() {
            return Ok(self);
        }

        let keep = graph::dependency_closure(&self.declarations, targets)?;

        let declarations: Vec<Declaration> = self
            .declarations
            .into_iter()
            .filter(|d| keep.contains(&d.name))
            .collect();

        let gates: Vec<Gate> = self
            .gates
            .into_iter()
            .filter_map(|mut gate| {
                gate.guards.retain(|g| keep.contains(g));
                if gate.guards.is_empty() { None } else { Some(gate) }
            })
            .collect();

        Ok(Self {
            declarations,
            gates,
        })
    }

    /// Topological execution order (indices into `declarations`).
    pub fn ordered(&self) -> Result<Vec<usize>> {
        graph::topological_order(&self.declarations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::declaration::Provision;
    use crate::error::ReconcileError;
    use crate::types::ProbedState;

    #[derive(Debug)]
    struct Inert;

    impl Provision for Inert {
        fn kind(&self) -> &'static str {
            "inert"
        }
        fn describe(&self) -> String {
            "inert".into()
        }
        fn probe(&self, _ctx: &RunContext) -> crate::error::Result<ProbedState> {
            Ok(ProbedState::Absent)
        }
        fn create(&self, _ctx: &RunContext) -> crate::error::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug)]
    struct AlwaysOk;

    impl Precondition for AlwaysOk {
        fn describe(&self) -> String {
            "always ok".into()
        }
        fn check(&self, _ctx: &RunContext) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn plan() -> Plan {
        let mut plan = Plan::new();
        plan.add(Declaration::new("identity", Box::new(Inert)));
        plan.add(Declaration::new("function", Box::new(Inert)).depends_on(&["identity"]));
        plan.add(Declaration::new("job", Box::new(Inert)).depends_on(&["function"]));
        plan.add(Declaration::new("bucket", Box::new(Inert)));
        plan.add_gate(Gate::new(Box::new(AlwaysOk), &["function", "job"]));
        plan
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let selected = plan().select(&[]).unwrap();
        assert_eq!(selected.len(), 4);
        assert_eq!(selected.gates.len(), 1);
    }

    #[test]
    fn selection_pulls_in_dependencies_and_keeps_gates() {
        let selected = plan().select(&["job".to_string()]).unwrap();
        let names: Vec<&str> = selected
            .declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, ["identity", "function", "job"]);
        assert_eq!(selected.gates.len(), 1);
    }

    #[test]
    fn selection_drops_gates_with_no_surviving_guards() {
        let selected = plan().select(&["bucket".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert!(selected.gates.is_empty());
    }

    #[test]
    fn selection_rejects_unknown_names() {
        let err = plan().select(&["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownDeclaration { .. }));
    }
}
