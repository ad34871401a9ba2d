//! Cross-principal token-minting grant.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, Result, RunContext};
use std::sync::Arc;

use super::{apply_error, probe_error, role_binding::policy_has_binding};

/// Grants the Cloud Scheduler service agent permission to mint OIDC
/// tokens as the pipeline service account.
///
/// The member is a template over `${project.number}` because the agent's
/// address embeds the numeric project id, which is only known at run
/// time. Declared best-effort in the plan: on shared projects the agent
/// often already holds the role project-wide.
#[derive(Debug)]
pub struct TokenGrant {
    cli: Arc<dyn CliRunner>,
    service_account_email: String,
    member_template: String,
    role: String,
}

impl TokenGrant {
    pub fn new(
        cli: Arc<dyn CliRunner>,
        service_account_email: &str,
        member_template: &str,
    ) -> Self {
        Self {
            cli,
            service_account_email: service_account_email.to_string(),
            member_template: member_template.to_string(),
            role: "roles/iam.serviceAccountTokenCreator".to_string(),
        }
    }
}

impl Provision for TokenGrant {
    fn kind(&self) -> &'static str {
        "cross-grant"
    }

    fn describe(&self) -> String {
        format!(
            "Token-creator grant on {} for the scheduler agent",
            self.service_account_email
        )
    }

    fn probe(&self, ctx: &RunContext) -> Result<ProbedState> {
        let member = ctx.resolve(&self.member_template)?;
        let policy = self
            .cli
            .run_json(
                Tool::Gcloud,
                &[
                    "iam",
                    "service-accounts",
                    "get-iam-policy",
                    &self.service_account_email,
                    "--format=json",
                ],
                Some(&self.service_account_email),
            )
            .map_err(|e| probe_error(&self.service_account_email, &e))?;

        Ok(if policy_has_binding(&policy, &member, &self.role) {
            ProbedState::present()
        } else {
            ProbedState::Absent
        })
    }

    fn create(&self, ctx: &RunContext) -> Result<()> {
        let member = ctx.resolve(&self.member_template)?;
        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "iam",
                    "service-accounts",
                    "add-iam-policy-binding",
                    &self.service_account_email,
                    &format!("--member={member}"),
                    &format!("--role={}", self.role),
                    "--format=none",
                ],
                Some(&self.service_account_email),
            )
            .map_err(|e| apply_error(&self.service_account_email, &e))?;
        Ok(())
    }
}
