//! Pipeline service account resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, Result, RunContext};
use std::sync::Arc;

use super::{apply_error, probe_error};

/// The identity everything else in the pipeline runs as.
#[derive(Debug)]
pub struct ServiceAccount {
    cli: Arc<dyn CliRunner>,
    project: String,
    account_id: String,
    display_name: String,
}

impl ServiceAccount {
    pub fn new(
        cli: Arc<dyn CliRunner>,
        project: &str,
        account_id: &str,
        display_name: &str,
    ) -> Self {
        Self {
            cli,
            project: project.to_string(),
            account_id: account_id.to_string(),
            display_name: display_name.to_string(),
        }
    }

    fn email(&self) -> String {
        format!("{}@{}.iam.gserviceaccount.com", self.account_id, self.project)
    }
}

impl Provision for ServiceAccount {
    fn kind(&self) -> &'static str {
        "identity"
    }

    fn describe(&self) -> String {
        format!("Service account {}", self.email())
    }

    fn probe(&self, _ctx: &RunContext) -> Result<ProbedState> {
        let email = self.email();
        let probed = self
            .cli
            .probe_json(
                Tool::Gcloud,
                &[
                    "iam",
                    "service-accounts",
                    "describe",
                    &email,
                    "--project",
                    &self.project,
                    "--format=json",
                ],
                &email,
            )
            .map_err(|e| probe_error(&email, &e))?;

        Ok(match probed {
            Some(_) => ProbedState::present(),
            None => ProbedState::Absent,
        })
    }

    fn create(&self, _ctx: &RunContext) -> Result<()> {
        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "iam",
                    "service-accounts",
                    "create",
                    &self.account_id,
                    "--project",
                    &self.project,
                    &format!("--display-name={}", self.display_name),
                ],
                Some(&self.account_id),
            )
            .map_err(|e| apply_error(&self.email(), &e))?;
        Ok(())
    }

    fn outputs(&self, _ctx: &RunContext) -> Result<Vec<(String, String)>> {
        Ok(vec![("email".to_string(), self.email())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeCli;
    use reconcile::ReconcileError;

    fn account(cli: &Arc<FakeCli>) -> ServiceAccount {
        ServiceAccount::new(cli.clone(), "demo-proj", "clima-pipeline", "Clima pipeline")
    }

    #[test]
    fn absent_when_describe_reports_not_found() {
        let cli = Arc::new(FakeCli::new().fail(
            &["service-accounts", "describe"],
            "ERROR: NOT_FOUND: Unknown service account",
        ));
        let state = account(&cli).probe(&RunContext::new()).unwrap();
        assert_eq!(state, ProbedState::Absent);
    }

    #[test]
    fn present_when_describe_succeeds() {
        let cli = Arc::new(FakeCli::new().ok(
            &["service-accounts", "describe"],
            r#"{"email": "clima-pipeline@demo-proj.iam.gserviceaccount.com"}"#,
        ));
        let state = account(&cli).probe(&RunContext::new()).unwrap();
        assert!(state.is_present());
    }

    #[test]
    fn auth_failure_is_not_absent() {
        let cli = Arc::new(FakeCli::new().fail(
            &["service-accounts", "describe"],
            "ERROR: There was a problem refreshing your current auth tokens",
        ));
        let err = account(&cli).probe(&RunContext::new()).unwrap_err();
        assert!(matches!(err, ReconcileError::ProbeTransport { .. }));
    }

    #[test]
    fn create_passes_account_id_and_project() {
        let cli = Arc::new(FakeCli::new().ok(&["service-accounts", "create"], ""));
        account(&cli).create(&RunContext::new()).unwrap();
        assert_eq!(
            cli.calls_matching(&["service-accounts", "create", "clima-pipeline"]),
            1
        );
        assert_eq!(cli.calls_matching(&["--project", "demo-proj"]), 1);
    }

    #[test]
    fn outputs_publish_the_email() {
        let cli = Arc::new(FakeCli::new());
        let outputs = account(&cli).outputs(&RunContext::new()).unwrap();
        assert_eq!(
            outputs,
            vec![(
                "email".to_string(),
                "clima-pipeline@demo-proj.iam.gserviceaccount.com".to_string()
            )]
        );
    }
}
