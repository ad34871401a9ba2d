//! Project-level IAM role binding resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, Result, RunContext};
use std::sync::Arc;

use super::{apply_error, probe_error};

/// One `member -> role` binding on the project's IAM policy.
///
/// "Absent" means the member does not hold the role; the policy itself
/// always exists.
#[derive(Debug)]
pub struct RoleBinding {
    cli: Arc<dyn CliRunner>,
    project: String,
    member: String,
    role: String,
}

impl RoleBinding {
    pub fn new(cli: Arc<dyn CliRunner>, project: &str, member: &str, role: &str) -> Self {
        Self {
            cli,
            project: project.to_string(),
            member: member.to_string(),
            role: role.to_string(),
        }
    }
}

/// Check whether a policy document contains `member` under `role`.
pub(crate) fn policy_has_binding(policy: &serde_json::Value, member: &str, role: &str) -> bool {
    policy["bindings"]
        .as_array()
        .is_some_and(|bindings| {
            bindings.iter().any(|b| {
                b["role"].as_str() == Some(role)
                    && b["members"]
                        .as_array()
                        .is_some_and(|m| m.iter().any(|v| v.as_str() == Some(member)))
            })
        })
}

impl Provision for RoleBinding {
    fn kind(&self) -> &'static str {
        "role-binding"
    }

    fn describe(&self) -> String {
        format!("Grant {} to {}", self.role, self.member)
    }

    fn probe(&self, _ctx: &RunContext) -> Result<ProbedState> {
        // The whole policy is fetched; a failure here means we cannot
        // tell whether the grant exists, not that it is missing.
        let policy = self
            .cli
            .run_json(
                Tool::Gcloud,
                &[
                    "projects",
                    "get-iam-policy",
                    &self.project,
                    "--format=json",
                ],
                Some(&self.project),
            )
            .map_err(|e| probe_error(&self.role, &e))?;

        Ok(if policy_has_binding(&policy, &self.member, &self.role) {
            ProbedState::present()
        } else {
            ProbedState::Absent
        })
    }

    fn create(&self, _ctx: &RunContext) -> Result<()> {
        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "projects",
                    "add-iam-policy-binding",
                    &self.project,
                    &format!("--member={}", self.member),
                    &format!("--role={}", self.role),
                    "--condition=None",
                    "--format=none",
                ],
                Some(&self.role),
            )
            .map_err(|e| apply_error(&self.role, &e))?;
        Ok(())
    }
}
