//! Run context and observer callbacks.
//!
//! The [`RunContext`] is the only channel through which one declaration's
//! computed outputs reach a later declaration's configuration. It lives
//! for exactly one run and is never persisted.

use crate::error::{ReconcileError, Result};
use crate::types::{ApplyOutcome, ProbedState};
use std::collections::BTreeMap;

/// Ephemeral map of computed outputs, keyed by declaration logical name.
///
/// Configuration strings may embed `${name.output}` placeholders that are
/// resolved against this map at probe/apply time. Output keys must not
/// contain dots; logical names may (the last dot separates the two).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    outputs: BTreeMap<String, BTreeMap<String, String>>,
}

impl RunContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an output under a declaration's logical name.
    pub fn insert(&mut self, owner: &str, key: &str, value: impl Into<String>) {
        self.outputs
            .entry(owner.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Look up one output.
    pub fn get(&self, owner: &str, key: &str) -> Option<&str> {
        self.outputs
            .get(owner)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    /// Look up an output by dotted path (`owner.key`, split at the last dot).
    pub fn lookup(&self, path: &str) -> Option<&str> {
        let (owner, key) = path.rsplit_once('.')?;
        self.get(owner, key)
    }

    /// All outputs recorded for one declaration.
    pub fn outputs_of(&self, owner: &str) -> Option<&BTreeMap<String, String>> {
        self.outputs.get(owner)
    }

    /// Expand `${owner.key}` placeholders in a template.
    ///
    /// A placeholder with no recorded output is a fatal precondition
    /// failure: it means a dependency either has not run or did not
    /// produce the value this configuration needs.
    pub fn resolve(&self, template: &str) -> Result<String> {
        let mut resolved = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            resolved.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| ReconcileError::precondition(
                    format!("unterminated ${{...}} placeholder in {template:?}"),
                    Vec::new(),
                ))?;
            let path = &after[..end];
            let value = self.lookup(path).ok_or_else(|| {
                ReconcileError::precondition(
                    format!("configuration references ${{{path}}}, but no such output is available"),
                    Vec::new(),
                )
            })?;
            resolved.push_str(value);
            rest = &after[end + 1..];
        }

        resolved.push_str(rest);
        Ok(resolved)
    }
}

/// Receives progress notifications during a run.
///
/// The executor reports what it checked, what it found, and what it did
/// for every declaration, before and after each decision, so the last
/// line printed by a failed run identifies the failing step.
pub trait Observer {
    /// A gate is about to be evaluated.
    fn on_gate(&mut self, description: &str);

    /// A declaration is about to be probed.
    fn on_step_start(&mut self, name: &str, kind: &str, description: &str);

    /// The probe finished.
    fn on_probe(&mut self, name: &str, state: &ProbedState);

    /// The declaration was reconciled.
    fn on_step_complete(&mut self, name: &str, outcome: &ApplyOutcome);

    /// A warning was recorded.
    fn on_warning(&mut self, message: &str);
}

/// No-op observer.
pub struct NoObserver;

impl Observer for NoObserver {
    fn on_gate(&mut self, _description: &str) {}
    fn on_step_start(&mut self, _name: &str, _kind: &str, _description: &str) {}
    fn on_probe(&mut self, _name: &str, _state: &ProbedState) {}
    fn on_step_complete(&mut self, _name: &str, _outcome: &ApplyOutcome) {}
    fn on_warning(&mut self, _message: &str) {}
}
