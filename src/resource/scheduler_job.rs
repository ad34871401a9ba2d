//! Cloud Scheduler job resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{PresentPolicy, ProbedState, Provision, Result, RunContext};
use std::sync::Arc;

use super::{apply_error, probe_error};

/// The periodic HTTP job that fires the extractor.
///
/// Replace-not-merge: when the live job no longer matches (the extractor
/// was redeployed to a new URL, the schedule changed), it is deleted and
/// recreated, never patched. The scheduler API cannot swap the target,
/// audience and identity fields atomically in place.
#[derive(Debug)]
pub struct SchedulerJob {
    cli: Arc<dyn CliRunner>,
    project: String,
    location: String,
    name: String,
    schedule: String,
    time_zone: String,
    uri_template: String,
    oidc_email: String,
}

impl SchedulerJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cli: Arc<dyn CliRunner>,
        project: &str,
        location: &str,
        name: &str,
        schedule: &str,
        time_zone: &str,
        uri_template: &str,
        oidc_email: &str,
    ) -> Self {
        Self {
            cli,
            project: project.to_string(),
            location: location.to_string(),
            name: name.to_string(),
            schedule: schedule.to_string(),
            time_zone: time_zone.to_string(),
            uri_template: uri_template.to_string(),
            oidc_email: oidc_email.to_string(),
        }
    }
}

impl Provision for SchedulerJob {
    fn kind(&self) -> &'static str {
        "scheduled-job"
    }

    fn describe(&self) -> String {
        format!("Scheduler job {} ({})", self.name, self.schedule)
    }

    fn probe(&self, ctx: &RunContext) -> Result<ProbedState> {
        let probed = self
            .cli
            .probe_json(
                Tool::Gcloud,
                &[
                    "scheduler",
                    "jobs",
                    "describe",
                    &self.name,
                    "--project",
                    &self.project,
                    &format!("--location={}", self.location),
                    "--format=json",
                ],
                &self.name,
            )
            .map_err(|e| probe_error(&self.name, &e))?;

        let Some(described) = probed else {
            return Ok(ProbedState::Absent);
        };

        if described["schedule"].as_str().is_some_and(|s| s != self.schedule) {
            return Ok(ProbedState::diverging(format!(
                "schedule is {}, declared {}",
                described["schedule"].as_str().unwrap_or_default(),
                self.schedule
            )));
        }
        if described["timeZone"].as_str().is_some_and(|tz| tz != self.time_zone) {
            return Ok(ProbedState::diverging(format!(
                "time zone is {}, declared {}",
                described["timeZone"].as_str().unwrap_or_default(),
                self.time_zone
            )));
        }

        // During a probe-only walk the extractor URL may not be
        // resolvable yet; without it the target cannot be compared.
        let current = described["httpTarget"]["uri"].as_str().unwrap_or_default();
        match ctx.resolve(&self.uri_template) {
            Ok(want) if current != want => Ok(ProbedState::diverging(format!(
                "target is {current}, declared {want}"
            ))),
            _ => Ok(ProbedState::present()),
        }
    }

    fn create(&self, ctx: &RunContext) -> Result<()> {
        let uri = ctx.resolve(&self.uri_template)?;
        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "scheduler",
                    "jobs",
                    "create",
                    "http",
                    &self.name,
                    "--project",
                    &self.project,
                    &format!("--location={}", self.location),
                    &format!("--schedule={}", self.schedule),
                    &format!("--time-zone={}", self.time_zone),
                    &format!("--uri={uri}"),
                    "--http-method=POST",
                    &format!("--oidc-service-account-email={}", self.oidc_email),
                    &format!("--oidc-token-audience={uri}"),
                    "--attempt-deadline=180s",
                ],
                Some(&self.name),
            )
            .map_err(|e| apply_error(&self.name, &e))?;
        Ok(())
    }

    fn delete(&self, _ctx: &RunContext) -> Result<()> {
        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "scheduler",
                    "jobs",
                    "delete",
                    &self.name,
                    "--project",
                    &self.project,
                    &format!("--location={}", self.location),
                    "--quiet",
                ],
                Some(&self.name),
            )
            .map_err(|e| apply_error(&self.name, &e))?;
        Ok(())
    }

    fn on_present(&self) -> PresentPolicy {
        PresentPolicy::Replace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeCli;
    use reconcile::ReconcileError;

    const URL: &str = "https://clima-extractor-h2x4a-uc.a.run.app";

    fn job(cli: &Arc<FakeCli>) -> SchedulerJob {
        SchedulerJob::new(
            cli.clone(),
            "demo-proj",
            "us-central1",
            "clima-extraccion-programada",
            "0 * * * *",
            "America/Santiago",
            "${function.extractor.invocation_url}",
            "clima-pipeline@demo-proj.iam.gserviceaccount.com",
        )
    }

    fn ctx_with_url() -> RunContext {
        let mut ctx = RunContext::new();
        ctx.insert("function.extractor", "invocation_url", URL);
        ctx
    }

    #[test]
    fn replaces_rather_than_merges_when_present() {
        let cli = Arc::new(FakeCli::new());
        assert_eq!(job(&cli).on_present(), PresentPolicy::Replace);
    }

    #[test]
    fn probe_reports_divergence_when_target_moved() {
        let cli = Arc::new(FakeCli::new().ok(
            &["scheduler", "jobs", "describe"],
            r#"{"httpTarget": {"uri": "https://old-revision-uc.a.run.app"}}"#,
        ));
        let state = job(&cli).probe(&ctx_with_url()).unwrap();
        assert!(matches!(state, ProbedState::Present { diverging: true, .. }));
    }

    #[test]
    fn probe_reports_divergence_when_schedule_changed() {
        let cli = Arc::new(FakeCli::new().ok(
            &["scheduler", "jobs", "describe"],
            &format!(r#"{{"schedule": "*/5 * * * *", "timeZone": "America/Santiago", "httpTarget": {{"uri": "{URL}"}}}}"#),
        ));
        let state = job(&cli).probe(&ctx_with_url()).unwrap();
        assert!(matches!(state, ProbedState::Present { diverging: true, .. }));
    }

    #[test]
    fn probe_matches_when_nothing_changed() {
        let cli = Arc::new(FakeCli::new().ok(
            &["scheduler", "jobs", "describe"],
            &format!(r#"{{"schedule": "0 * * * *", "timeZone": "America/Santiago", "httpTarget": {{"uri": "{URL}"}}}}"#),
        ));
        let state = job(&cli).probe(&ctx_with_url()).unwrap();
        assert_eq!(state, ProbedState::present());
    }

    #[test]
    fn probe_without_resolved_url_is_still_present() {
        let cli = Arc::new(FakeCli::new().ok(
            &["scheduler", "jobs", "describe"],
            r#"{"httpTarget": {"uri": "https://old-revision-uc.a.run.app"}}"#,
        ));
        let state = job(&cli).probe(&RunContext::new()).unwrap();
        assert_eq!(state, ProbedState::present());
    }

    #[test]
    fn create_targets_the_resolved_url_and_audience() {
        let cli = Arc::new(FakeCli::new().ok(&["scheduler", "jobs", "create"], ""));
        job(&cli).create(&ctx_with_url()).unwrap();
        assert_eq!(cli.calls_matching(&[&format!("--uri={URL}")]), 1);
        assert_eq!(cli.calls_matching(&[&format!("--oidc-token-audience={URL}")]), 1);
        assert_eq!(cli.calls_matching(&["--time-zone=America/Santiago"]), 1);
    }

    #[test]
    fn create_without_extractor_output_is_a_precondition_failure() {
        let cli = Arc::new(FakeCli::new().ok(&["scheduler", "jobs", "create"], ""));
        let err = job(&cli).create(&RunContext::new()).unwrap_err();
        assert!(matches!(err, ReconcileError::PreconditionUnmet { .. }));
    }

    #[test]
    fn delete_is_quiet_and_scoped() {
        let cli = Arc::new(FakeCli::new().ok(&["scheduler", "jobs", "delete"], ""));
        job(&cli).delete(&RunContext::new()).unwrap();
        assert_eq!(
            cli.calls_matching(&["scheduler", "jobs", "delete", "clima-extraccion-programada", "--quiet"]),
            1
        );
    }
}
