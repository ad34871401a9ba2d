//! Reconcile the pipeline: create what is missing, skip what exists.
//!
//! The same command covers first deploys, repair runs and single-target
//! redeploys (`--only`); every invocation re-probes and converges.

use anyhow::Result;
use colored::Colorize;
use reconcile::{execute, ApplyOutcome, Observer, ProbedState, RunReport};

use crate::config::PipelineConfig;
use crate::ui;
use crate::Context;

/// Prints one status line per step as the executor works through the
/// plan, so the last printed line of a failed run names the failing step.
struct ConsoleObserver {
    step: usize,
    total: usize,
}

impl Observer for ConsoleObserver {
    fn on_gate(&mut self, description: &str) {
        println!("  {} {}", "◌".cyan(), format!("Gate: {description}").dimmed());
    }

    fn on_step_start(&mut self, name: &str, _kind: &str, description: &str) {
        self.step += 1;
        println!();
        ui::step(self.step, self.total, &format!("{} {}", name.bold(), description.dimmed()));
    }

    fn on_probe(&mut self, _name: &str, state: &ProbedState) {
        let found = match state {
            ProbedState::Absent => "not found".to_string(),
            ProbedState::Present { diverging: false, .. } => "already exists".to_string(),
            ProbedState::Present { diverging: true, detail } => format!(
                "exists, diverging{}",
                detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
            ),
        };
        ui::dim(&format!("probe: {found}"));
    }

    fn on_step_complete(&mut self, name: &str, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Created => ui::success(&format!("{name} created")),
            ApplyOutcome::SkippedAlreadyPresent => {
                println!("  {} {name} unchanged", "○".dimmed());
            }
            ApplyOutcome::Failed { reason } => ui::error(&format!("{name} failed: {reason}")),
        }
    }

    fn on_warning(&mut self, message: &str) {
        ui::warn(message);
    }
}

pub fn run(
    app: &Context,
    cfg: &PipelineConfig,
    only: &[String],
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    ui::header(&format!("Deploying clima pipeline: {}", cfg.project));
    ui::kv("Region", &cfg.region);
    ui::kv("Schedule", &format!("{} ({})", cfg.schedule, cfg.time_zone));
    if !only.is_empty() {
        ui::kv("Only", &only.join(", "));
    }
    if app.verbose > 0 {
        ui::kv("Sources", &cfg.source_root.display().to_string());
    }
    println!();

    let cli = crate::discover_cli()?;
    let plan = crate::plan::build_plan(cfg, &cli).select(only)?;

    let pb = crate::progress::spinner("Looking up project metadata...");
    let number = crate::plan::lookup_project_number(cli.as_ref(), &cfg.project)?;
    crate::progress::finish_success(&pb, &format!("Project number {number}"));

    let mut ctx = crate::plan::seed_context(cfg, &number);

    if dry_run {
        ui::warn("Dry run - probing only, no changes will be made");
        let rows = super::status::survey(&plan, &mut ctx)?;
        super::status::print_rows(app, &rows);
        return Ok(());
    }

    if !yes && !confirm(&format!("Reconcile {} declarations?", plan.len()))? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let mut observer = ConsoleObserver {
        step: 0,
        total: plan.len(),
    };
    let report = execute(&plan, &mut ctx, &mut observer)?;

    print_summary(&report, &ctx);
    Ok(())
}

fn print_summary(report: &RunReport, ctx: &reconcile::RunContext) {
    println!();
    if report.failed() == 0 {
        ui::success("Pipeline reconciled");
    } else {
        ui::warn("Pipeline reconciled with warnings");
    }

    if report.created() > 0 {
        println!("    • {} resources created", report.created());
    }
    if report.skipped() > 0 {
        println!("    • {} resources already present", report.skipped());
    }
    if report.failed() > 0 {
        println!("    • {} best-effort steps failed", report.failed());
    }

    if let Some(url) = ctx.get(crate::plan::names::EXTRACTOR, "invocation_url") {
        ui::kv("Extractor URL", url);
    }

    if !report.warnings.is_empty() {
        ui::section("Warnings");
        for warning in &report.warnings {
            ui::warn(warning);
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?;

    Ok(confirmed)
}
