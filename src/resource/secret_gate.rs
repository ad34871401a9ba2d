//! Weather API key precondition.

use gcloudkit::{CliRunner, Tool};
use reconcile::{Precondition, ReconcileError, Result, RunContext};
use std::sync::Arc;

/// Checks that the weather API key secret exists and has at least one
/// enabled version before any function is deployed.
///
/// This is a gate, not a managed resource: the key material is owned by
/// the operator and never created here. Deploying functions without it
/// would only move the failure to runtime, so the run stops early with
/// the exact commands to fix it.
#[derive(Debug)]
pub struct SecretGate {
    cli: Arc<dyn CliRunner>,
    project: String,
    secret: String,
}

impl SecretGate {
    pub fn new(cli: Arc<dyn CliRunner>, project: &str, secret: &str) -> Self {
        Self {
            cli,
            project: project.to_string(),
            secret: secret.to_string(),
        }
    }

    fn add_version_command(&self) -> String {
        format!(
            "printf '%s' \"$WEATHER_API_KEY\" | gcloud secrets versions add {} --project={} --data-file=-",
            self.secret, self.project
        )
    }
}

impl Precondition for SecretGate {
    fn describe(&self) -> String {
        format!("Secret {} has an enabled version", self.secret)
    }

    fn check(&self, _ctx: &RunContext) -> Result<()> {
        let listed = self.cli.run_json(
            Tool::Gcloud,
            &[
                "secrets",
                "versions",
                "list",
                &self.secret,
                "--project",
                &self.project,
                "--filter=state:ENABLED",
                "--format=json",
            ],
            Some(&self.secret),
        );

        match listed {
            Ok(versions) => {
                let count = versions.as_array().map_or(0, Vec::len);
                if count == 0 {
                    return Err(ReconcileError::precondition(
                        format!(
                            "secret {} exists but has no enabled versions; the extractor cannot call the weather API without it",
                            self.secret
                        ),
                        vec![self.add_version_command()],
                    ));
                }
                Ok(())
            }
            Err(err) if err.is_not_found() => Err(ReconcileError::precondition(
                format!(
                    "secret {} does not exist in project {}",
                    self.secret, self.project
                ),
                vec![
                    format!(
                        "gcloud secrets create {} --project={} --replication-policy=automatic",
                        self.secret, self.project
                    ),
                    self.add_version_command(),
                ],
            )),
            Err(err) => Err(ReconcileError::probe_transport(&self.secret, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testutil::FakeCli;

    fn gate(cli: &Arc<FakeCli>) -> SecretGate {
        SecretGate::new(cli.clone(), "demo-proj", "clima-api-key")
    }

    #[test]
    fn passes_with_an_enabled_version() {
        let cli = Arc::new(FakeCli::new().ok(
            &["secrets", "versions", "list"],
            r#"[{"name": "projects/1/secrets/clima-api-key/versions/1", "state": "ENABLED"}]"#,
        ));
        gate(&cli).check(&RunContext::new()).unwrap();
    }

    #[test]
    fn fails_with_remediation_when_secret_is_empty() {
        let cli = Arc::new(FakeCli::new().ok(&["secrets", "versions", "list"], "[]"));
        let err = gate(&cli).check(&RunContext::new()).unwrap_err();
        assert!(matches!(err, ReconcileError::PreconditionUnmet { .. }));
        assert!(err.remediation().iter().any(|c| c.contains("versions add")));
    }

    #[test]
    fn fails_with_create_command_when_secret_is_missing() {
        let cli = Arc::new(FakeCli::new().fail(
            &["secrets", "versions", "list"],
            "ERROR: NOT_FOUND: Secret [clima-api-key] not found",
        ));
        let err = gate(&cli).check(&RunContext::new()).unwrap_err();
        let remediation = err.remediation();
        assert!(remediation.iter().any(|c| c.contains("secrets create")));
        assert!(remediation.iter().any(|c| c.contains("versions add")));
    }

    #[test]
    fn transport_failures_are_not_precondition_failures() {
        let cli = Arc::new(FakeCli::new().fail(
            &["secrets", "versions", "list"],
            "ERROR: UNAVAILABLE: service temporarily unreachable",
        ));
        let err = gate(&cli).check(&RunContext::new()).unwrap_err();
        assert!(matches!(err, ReconcileError::ProbeTransport { .. }));
    }
}
