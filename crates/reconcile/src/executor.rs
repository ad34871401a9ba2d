//! Sequential reconciliation of a plan.
//!
//! Execution is single-threaded and synchronous: each declaration's
//! probe-then-apply is a blocking round trip to the management API, in
//! topological order. The run is idempotent by probing, not by
//! construction: re-invoking it re-probes everything and skips what
//! already exists.

use crate::context::{Observer, RunContext};
use crate::declaration::Declaration;
use crate::error::Result;
use crate::planner::Plan;
use crate::types::{ApplyOutcome, PresentPolicy, ProbedState, RunReport, StepReport};

/// Reconcile every declaration in the plan exactly once.
///
/// Fatal conditions (probe transport failures, unmet gates, apply
/// failures on required declarations) unwind immediately. Best-effort
/// apply failures and divergence warnings accumulate in the returned
/// [`RunReport`] without affecting the result.
pub fn execute(
    plan: &Plan,
    ctx: &mut RunContext,
    observer: &mut dyn Observer,
) -> Result<RunReport> {
    let order = plan.ordered()?;
    let mut gate_done = vec![false; plan.gates.len()];
    let mut report = RunReport::default();

    for idx in order {
        let decl = &plan.declarations[idx];

        // Gates fire once, right before the first declaration they guard.
        for (gi, gate) in plan.gates.iter().enumerate() {
            if gate_done[gi] || !gate.guards.iter().any(|g| g == &decl.name) {
                continue;
            }
            observer.on_gate(&gate.precondition.describe());
            gate.precondition.check(ctx)?;
            gate_done[gi] = true;
        }

        observer.on_step_start(&decl.name, decl.kind(), &decl.provision.describe());

        // A probe that cannot determine state is always fatal; absent is
        // a successful probe result, not an error.
        let probed = decl.provision.probe(ctx)?;
        observer.on_probe(&decl.name, &probed);

        let outcome = match &probed {
            ProbedState::Absent => {
                apply(decl, ctx, &mut report, observer, |d, c| d.provision.create(c))?
            }
            ProbedState::Present { diverging, detail } => match decl.provision.on_present() {
                PresentPolicy::Skip => {
                    if *diverging {
                        let note = detail.as_deref().unwrap_or("configuration differs");
                        warn(
                            &mut report,
                            observer,
                            format!("{}: exists but diverges ({note}); leaving it untouched", decl.name),
                        );
                    }
                    ApplyOutcome::SkippedAlreadyPresent
                }
                // Replace-not-merge: when the live configuration drifted,
                // one delete then one create, never an in-place update.
                PresentPolicy::Replace => {
                    if *diverging {
                        let deleted = apply(decl, ctx, &mut report, observer, |d, c| {
                            d.provision.delete(c)
                        })?;
                        match deleted {
                            ApplyOutcome::Failed { .. } => deleted,
                            _ => apply(decl, ctx, &mut report, observer, |d, c| {
                                d.provision.create(c)
                            })?,
                        }
                    } else {
                        ApplyOutcome::SkippedAlreadyPresent
                    }
                }
            },
        };

        if outcome.is_success() {
            record_outputs(decl, ctx, &mut report, observer)?;
        }

        observer.on_step_complete(&decl.name, &outcome);
        report.steps.push(StepReport {
            name: decl.name.clone(),
            kind: decl.kind().to_string(),
            outcome,
        });
    }

    Ok(report)
}

/// Run one mutating call under the declaration's error policy.
fn apply(
    decl: &Declaration,
    ctx: &RunContext,
    report: &mut RunReport,
    observer: &mut dyn Observer,
    op: impl FnOnce(&Declaration, &RunContext) -> Result<()>,
) -> Result<ApplyOutcome> {
    match op(decl, ctx) {
        Ok(()) => Ok(ApplyOutcome::Created),
        Err(err) if decl.required => Err(err),
        Err(err) => {
            let reason = err.to_string();
            warn(
                report,
                observer,
                format!("{}: {reason} (best-effort, continuing)", decl.name),
            );
            Ok(ApplyOutcome::Failed { reason })
        }
    }
}

fn record_outputs(
    decl: &Declaration,
    ctx: &mut RunContext,
    report: &mut RunReport,
    observer: &mut dyn Observer,
) -> Result<()> {
    match decl.provision.outputs(ctx) {
        Ok(pairs) => {
            for (key, value) in pairs {
                ctx.insert(&decl.name, &key, value);
            }
            Ok(())
        }
        Err(err) if decl.required => Err(err),
        Err(err) => {
            warn(
                report,
                observer,
                format!("{}: could not read outputs: {err}", decl.name),
            );
            Ok(())
        }
    }
}

fn warn(report: &mut RunReport, observer: &mut dyn Observer, message: String) {
    observer.on_warning(&message);
    report.warnings.push(message);
}
