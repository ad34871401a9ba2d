//! Dependency ordering over declarations.
//!
//! The dependency graph is explicit data on each [`Declaration`], not
//! positional order, so ordering is enforced by topological sort and is
//! independently testable.

use crate::declaration::Declaration;
use crate::error::{ReconcileError, Result};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Compute a topological execution order over the declarations.
///
/// The order is deterministic: among declarations whose dependencies are
/// all satisfied, declaration (insertion) order wins. Returns indices
/// into the input slice.
pub fn topological_order(declarations: &[Declaration]) -> Result<Vec<usize>> {
    let index = index_by_name(declarations)?;

    for decl in declarations {
        for dep in &decl.depends_on {
            if !index.contains_key(dep.as_str()) {
                return Err(ReconcileError::UnknownDependency {
                    name: decl.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let mut order = Vec::with_capacity(declarations.len());
    let mut emitted = vec![false; declarations.len()];

    while order.len() < declarations.len() {
        let mut progressed = false;
        for (i, decl) in declarations.iter().enumerate() {
            if emitted[i] {
                continue;
            }
            let ready = decl
                .depends_on
                .iter()
                .all(|dep| emitted[index[dep.as_str()]]);
            if ready {
                emitted[i] = true;
                order.push(i);
                progressed = true;
            }
        }
        if !progressed {
            let blocked = declarations
                .iter()
                .enumerate()
                .find(|(i, _)| !emitted[*i])
                .map(|(_, d)| d.name.clone())
                .unwrap_or_default();
            return Err(ReconcileError::DependencyCycle { name: blocked });
        }
    }

    Ok(order)
}

/// Names of `targets` plus everything they transitively depend on.
///
/// Used by filtered entry points ("redeploy one function"): the selected
/// declarations are applied together with their dependencies, which is
/// safe because every step re-probes and skips what already exists.
pub fn dependency_closure(
    declarations: &[Declaration],
    targets: &[String],
) -> Result<BTreeSet<String>> {
    let index = index_by_name(declarations)?;

    let mut selected: BTreeSet<String> = BTreeSet::new();
    let mut pending: Vec<&str> = Vec::new();

    for target in targets {
        if !index.contains_key(target.as_str()) {
            return Err(ReconcileError::UnknownDeclaration {
                name: target.clone(),
            });
        }
        pending.push(target);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    while let Some(name) = pending.pop() {
        if !seen.insert(name) {
            continue;
        }
        selected.insert(name.to_string());
        for dep in &declarations[index[name]].depends_on {
            pending.push(dep);
        }
    }

    Ok(selected)
}

fn index_by_name(declarations: &[Declaration]) -> Result<HashMap<&str, usize>> {
    let mut index = HashMap::with_capacity(declarations.len());
    for (i, decl) in declarations.iter().enumerate() {
        if index.insert(decl.name.as_str(), i).is_some() {
            return Err(ReconcileError::DuplicateName {
                name: decl.name.clone(),
            });
        }
    }
    Ok(index)
}
