//! Post-deploy verification.
//!
//! Exercises the deployed pipeline end-to-end and summarizes health
//! signals without mutating anything: trigger the scheduler job once,
//! wait for propagation, then read logs, subscriptions, table freshness
//! and bucket contents. Observability only; the command always exits 0.

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use colored::Colorize;
use gcloudkit::{CliRunner, Tool};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::ui;
use crate::Context;

/// Seconds to wait after triggering the job before reading signals.
const DEFAULT_GRACE_SECS: u64 = 45;

/// Rows older than this count as "no recent activity".
const STALE_AFTER_HOURS: i64 = 24;

/// Outcome of one health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Signal looks healthy
    Pass,
    /// Nothing recent to look at (or the signal could not be read)
    NoActivity,
    /// The pipeline logged errors
    Errors,
}

/// One verified signal.
#[derive(Debug)]
pub struct CheckResult {
    pub label: String,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckResult {
    fn pass(label: &str, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            status: CheckStatus::Pass,
            detail: detail.into(),
        }
    }

    fn quiet(label: &str, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            status: CheckStatus::NoActivity,
            detail: detail.into(),
        }
    }

    fn errors(label: &str, detail: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            status: CheckStatus::Errors,
            detail: detail.into(),
        }
    }
}

/// Collapse individual signals into the run verdict.
pub fn overall(results: &[CheckResult]) -> CheckStatus {
    if results.iter().any(|r| r.status == CheckStatus::Errors) {
        CheckStatus::Errors
    } else if results.iter().any(|r| r.status == CheckStatus::NoActivity) {
        CheckStatus::NoActivity
    } else {
        CheckStatus::Pass
    }
}

/// Read-only health prober for a deployed pipeline.
pub struct Verifier<'a> {
    cli: &'a dyn CliRunner,
    cfg: &'a PipelineConfig,
}

impl<'a> Verifier<'a> {
    pub fn new(cli: &'a dyn CliRunner, cfg: &'a PipelineConfig) -> Self {
        Self { cli, cfg }
    }

    /// Fire the scheduler job once, out of band.
    pub fn trigger_once(&self) -> CheckResult {
        let run = self.cli.run_checked(
            Tool::Gcloud,
            &[
                "scheduler",
                "jobs",
                "run",
                &self.cfg.job,
                "--project",
                &self.cfg.project,
                &format!("--location={}", self.cfg.region),
            ],
            Some(&self.cfg.job),
        );

        match run {
            Ok(_) => CheckResult::pass("trigger", format!("job {} fired", self.cfg.job)),
            Err(err) => CheckResult::quiet("trigger", format!("could not trigger job: {err}")),
        }
    }

    /// All read-only signals, in reporting order.
    pub fn checks(&self) -> Vec<CheckResult> {
        vec![
            self.check_function_logs("extractor logs", &self.cfg.extractor),
            self.check_function_logs("processor logs", &self.cfg.processor),
            self.check_subscriptions(),
            self.check_table(),
            self.check_bucket(),
        ]
    }

    fn check_function_logs(&self, label: &str, function: &str) -> CheckResult {
        let logs = self.cli.run_json(
            Tool::Gcloud,
            &[
                "functions",
                "logs",
                "read",
                function,
                "--project",
                &self.cfg.project,
                "--region",
                &self.cfg.region,
                "--gen2",
                "--limit=20",
                "--format=json",
            ],
            Some(function),
        );

        let entries = match logs {
            Ok(serde_json::Value::Array(entries)) => entries,
            Ok(_) => Vec::new(),
            Err(err) => return CheckResult::quiet(label, format!("could not read logs: {err}")),
        };

        if entries.is_empty() {
            return CheckResult::quiet(label, "no recent log entries");
        }

        let errors = entries.iter().filter(|e| is_error_entry(e)).count();
        if errors > 0 {
            CheckResult::errors(label, format!("{errors} error entries in the last {}", entries.len()))
        } else {
            CheckResult::pass(label, format!("{} recent entries, no errors", entries.len()))
        }
    }

    fn check_subscriptions(&self) -> CheckResult {
        let label = "topic subscriptions";
        let listed = self.cli.run_json(
            Tool::Gcloud,
            &[
                "pubsub",
                "topics",
                "list-subscriptions",
                &self.cfg.raw_topic,
                "--project",
                &self.cfg.project,
                "--format=json",
            ],
            Some(&self.cfg.raw_topic),
        );

        match listed {
            Ok(serde_json::Value::Array(subs)) if !subs.is_empty() => {
                CheckResult::pass(label, format!("{} subscription(s) attached", subs.len()))
            }
            Ok(_) => CheckResult::quiet(
                label,
                format!("no subscriptions on {}; is the processor deployed?", self.cfg.raw_topic),
            ),
            Err(err) => CheckResult::quiet(label, format!("could not list: {err}")),
        }
    }

    fn check_table(&self) -> CheckResult {
        let label = "table rows";
        let query = format!(
            "SELECT COUNT(*) AS total, CAST(MAX(hora_actual) AS STRING) AS ultima FROM `{}.{}.{}`",
            self.cfg.project, self.cfg.dataset, self.cfg.table
        );
        let queried = self.cli.run_json(
            Tool::Bq,
            &[
                "query",
                &format!("--project_id={}", self.cfg.project),
                "--nouse_legacy_sql",
                "--format=json",
                &query,
            ],
            Some(&self.cfg.table),
        );

        let row = match queried {
            Ok(serde_json::Value::Array(rows)) if !rows.is_empty() => rows[0].clone(),
            Ok(_) => return CheckResult::quiet(label, "query returned nothing"),
            Err(err) => return CheckResult::quiet(label, format!("could not query: {err}")),
        };

        let total = row["total"]
            .as_str()
            .and_then(|t| t.parse::<u64>().ok())
            .or_else(|| row["total"].as_u64())
            .unwrap_or(0);
        if total == 0 {
            return CheckResult::quiet(label, "table exists but holds no rows yet");
        }

        let newest = row["ultima"].as_str().unwrap_or_default();
        match parse_bq_timestamp(newest) {
            Some(ts) => {
                let age_hours = (Utc::now().naive_utc() - ts).num_hours();
                if age_hours > STALE_AFTER_HOURS {
                    CheckResult::quiet(
                        label,
                        format!("{total} rows, but newest is {age_hours}h old"),
                    )
                } else {
                    CheckResult::pass(label, format!("{total} rows, newest {newest}"))
                }
            }
            None => CheckResult::pass(label, format!("{total} rows")),
        }
    }

    fn check_bucket(&self) -> CheckResult {
        let label = "bucket objects";
        let listed = self.cli.run_checked(
            Tool::Gcloud,
            &[
                "storage",
                "ls",
                &format!("gs://{}", self.cfg.bucket),
            ],
            Some(&self.cfg.bucket),
        );

        match listed {
            Ok(listing) => {
                let prefixes = listing.lines().filter(|l| !l.trim().is_empty()).count();
                if prefixes == 0 {
                    CheckResult::quiet(label, "bucket is empty")
                } else {
                    CheckResult::pass(label, format!("{prefixes} location prefix(es) written"))
                }
            }
            Err(err) => CheckResult::quiet(label, format!("could not list: {err}")),
        }
    }
}

fn is_error_entry(entry: &serde_json::Value) -> bool {
    let level = entry["level"].as_str().unwrap_or_default();
    let severity = entry["severity"].as_str().unwrap_or_default();
    level.starts_with('E') || severity == "ERROR" || severity == "CRITICAL"
}

/// Parse `CAST(ts AS STRING)` output; BigQuery prints a few variants.
fn parse_bq_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.len() < 19 {
        return None;
    }
    NaiveDateTime::parse_from_str(&trimmed[..19], "%Y-%m-%d %H:%M:%S").ok()
}

pub fn run(app: &Context, cfg: &PipelineConfig, grace_secs: Option<u64>, no_trigger: bool) -> Result<()> {
    ui::header(&format!("Verifying clima pipeline: {}", cfg.project));

    let cli = crate::discover_cli()?;
    let verifier = Verifier::new(cli.as_ref(), cfg);

    let mut results = Vec::new();
    if no_trigger {
        ui::info("Skipping job trigger (--no-trigger)");
    } else {
        results.push(verifier.trigger_once());
        let grace = grace_secs.unwrap_or(DEFAULT_GRACE_SECS);
        if grace > 0 {
            let pb = crate::progress::spinner(&format!(
                "Waiting {grace}s for the pipeline to propagate..."
            ));
            std::thread::sleep(Duration::from_secs(grace));
            pb.finish_and_clear();
        }
    }

    results.extend(verifier.checks());

    ui::section("Signals");
    for result in &results {
        let glyph = match result.status {
            CheckStatus::Pass => "✓".green(),
            CheckStatus::NoActivity => "○".yellow(),
            CheckStatus::Errors => "✗".red(),
        };
        println!("  {glyph} {}", result.label);
        if !app.quiet {
            ui::dim(&format!("    {}", result.detail));
        }
    }

    println!();
    match overall(&results) {
        CheckStatus::Pass => ui::success("No errors observed"),
        CheckStatus::NoActivity => ui::warn("No recent activity observed"),
        CheckStatus::Errors => ui::warn("Errors observed - check the function logs"),
    }

    // Verification reports, it never gates: warnings do not fail the run.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeCli;
    use std::path::PathBuf;

    fn config() -> PipelineConfig {
        PipelineConfig {
            project: "demo-proj".into(),
            region: "us-central1".into(),
            schedule: "0 * * * *".into(),
            time_zone: "America/Santiago".into(),
            service_account_id: "clima-pipeline".into(),
            raw_topic: "clima-datos-crudos".into(),
            dead_letter_topic: "clima-datos-crudos-dlq".into(),
            bucket: "datos-clima-bronce".into(),
            lifecycle_days: 90,
            dataset: "clima".into(),
            table: "condiciones_actuales".into(),
            extractor: "clima-extractor".into(),
            processor: "clima-procesador".into(),
            job: "clima-extraccion-programada".into(),
            secret: "clima-api-key".into(),
            source_root: PathBuf::from("."),
            runtime: "python312".into(),
        }
    }

    fn recent_timestamp() -> String {
        Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn healthy_cli() -> FakeCli {
        FakeCli::new()
            .ok(
                &["functions", "logs", "read"],
                r#"[{"level": "I", "log": "ok"}, {"level": "I", "log": "ok"}]"#,
            )
            .ok(
                &["topics", "list-subscriptions"],
                r#"[{"name": "projects/demo-proj/subscriptions/eventarc-1"}]"#,
            )
            .ok(
                &["query"],
                &format!(r#"[{{"total": "42", "ultima": "{}"}}]"#, recent_timestamp()),
            )
            .ok(
                &["storage", "ls"],
                "gs://datos-clima-bronce/santiago/\ngs://datos-clima-bronce/valparaiso/\n",
            )
    }

    #[test]
    fn healthy_pipeline_passes_every_check() {
        let cli = healthy_cli();
        let cfg = config();
        let results = Verifier::new(&cli, &cfg).checks();
        assert!(results.iter().all(|r| r.status == CheckStatus::Pass));
        assert_eq!(overall(&results), CheckStatus::Pass);
    }

    #[test]
    fn error_log_entries_dominate_the_verdict() {
        let cli = healthy_cli().ok(
            &["functions", "logs", "read", "clima-procesador"],
            r#"[{"level": "E", "log": "boom"}, {"level": "I", "log": "ok"}]"#,
        );
        let cfg = config();
        let results = Verifier::new(&cli, &cfg).checks();
        assert_eq!(overall(&results), CheckStatus::Errors);
    }

    #[test]
    fn empty_table_reads_as_no_activity() {
        let cli = healthy_cli().ok(&["query"], r#"[{"total": "0", "ultima": null}]"#);
        let cfg = config();
        let results = Verifier::new(&cli, &cfg).checks();
        assert_eq!(overall(&results), CheckStatus::NoActivity);
    }

    #[test]
    fn stale_rows_read_as_no_activity() {
        let cli = healthy_cli().ok(
            &["query"],
            r#"[{"total": "42", "ultima": "2020-01-01 00:00:00"}]"#,
        );
        let cfg = config();
        let results = Verifier::new(&cli, &cfg).checks();
        assert_eq!(overall(&results), CheckStatus::NoActivity);
    }

    #[test]
    fn unreadable_signals_warn_but_never_error() {
        let cli = FakeCli::new(); // everything NOT_FOUND
        let cfg = config();
        let results = Verifier::new(&cli, &cfg).checks();
        assert!(results.iter().all(|r| r.status == CheckStatus::NoActivity));
        assert_eq!(overall(&results), CheckStatus::NoActivity);
    }

    #[test]
    fn trigger_failure_is_a_warning_not_an_error() {
        let cli = FakeCli::new().fail(
            &["scheduler", "jobs", "run"],
            "ERROR: NOT_FOUND: job does not exist",
        );
        let cfg = config();
        let result = Verifier::new(&cli, &cfg).trigger_once();
        assert_eq!(result.status, CheckStatus::NoActivity);
    }

    #[test]
    fn bq_timestamps_parse_in_common_shapes() {
        assert!(parse_bq_timestamp("2026-08-07 10:00:00").is_some());
        assert!(parse_bq_timestamp("2026-08-07 10:00:00+00").is_some());
        assert!(parse_bq_timestamp("2026-08-07 10:00:00.123456 UTC").is_some());
        assert!(parse_bq_timestamp("not a timestamp").is_none());
    }
}
