//! Read-only survey of the pipeline's resources.
//!
//! Probes every declaration and reports present/absent/diverging without
//! applying anything. Divergence is surfaced here precisely because the
//! reconciler will not act on it.

use anyhow::Result;
use colored::Colorize;
use reconcile::{Plan, ProbedState, RunContext};

use crate::config::PipelineConfig;
use crate::ui;
use crate::Context;

/// Probe result for one declaration.
pub struct SurveyRow {
    pub name: String,
    pub kind: String,
    pub state: ProbedState,
}

/// Probe every declaration in order, recording outputs of present
/// resources so later probes can compare templated configuration.
pub fn survey(plan: &Plan, ctx: &mut RunContext) -> Result<Vec<SurveyRow>> {
    let mut rows = Vec::with_capacity(plan.len());

    for idx in plan.ordered()? {
        let decl = &plan.declarations[idx];
        let state = decl.provision.probe(ctx)?;

        if state.is_present() {
            for (key, value) in decl.provision.outputs(ctx)? {
                ctx.insert(&decl.name, &key, value);
            }
        }

        rows.push(SurveyRow {
            name: decl.name.clone(),
            kind: decl.kind().to_string(),
            state,
        });
    }

    Ok(rows)
}

/// Print a survey, one line per declaration.
pub fn print_rows(app: &Context, rows: &[SurveyRow]) {
    let mut present = 0usize;
    let mut absent = 0usize;
    let mut diverging = 0usize;

    for row in rows {
        match &row.state {
            ProbedState::Present { diverging: false, .. } => {
                present += 1;
                println!(
                    "  {} {} {}",
                    "✓".green(),
                    row.name,
                    format!("({})", row.kind).dimmed()
                );
            }
            ProbedState::Present { diverging: true, detail } => {
                diverging += 1;
                println!(
                    "  {} {} {}",
                    "⚠".yellow(),
                    row.name,
                    format!("({})", row.kind).dimmed()
                );
                if !app.quiet
                    && let Some(detail) = detail
                {
                    ui::dim(&format!("    {detail}"));
                }
            }
            ProbedState::Absent => {
                absent += 1;
                println!(
                    "  {} {} {}",
                    "○".dimmed(),
                    row.name,
                    format!("({}) missing", row.kind).dimmed()
                );
            }
        }
    }

    println!();
    ui::kv(
        "Summary",
        &format!("{present} present, {absent} missing, {diverging} diverging"),
    );
}

pub fn run(app: &Context, cfg: &PipelineConfig, only: &[String]) -> Result<()> {
    ui::header(&format!("Pipeline status: {}", cfg.project));

    let cli = crate::discover_cli()?;
    let plan = crate::plan::build_plan(cfg, &cli).select(only)?;

    let pb = crate::progress::spinner("Looking up project metadata...");
    let number = crate::plan::lookup_project_number(cli.as_ref(), &cfg.project)?;
    pb.finish_and_clear();

    let mut ctx = crate::plan::seed_context(cfg, &number);
    let rows = survey(&plan, &mut ctx)?;
    print_rows(app, &rows);

    if rows.iter().any(|r| !r.state.is_present()) {
        println!();
        ui::info("Run 'climactl deploy' to create what is missing");
    }

    Ok(())
}
