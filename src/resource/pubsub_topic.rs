//! Pub/Sub topic resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, Result, RunContext};
use std::sync::Arc;

use super::{apply_error, probe_error};

/// A messaging channel; used for both the raw-data topic and its
/// dead-letter counterpart.
#[derive(Debug)]
pub struct PubsubTopic {
    cli: Arc<dyn CliRunner>,
    project: String,
    name: String,
}

impl PubsubTopic {
    pub fn new(cli: Arc<dyn CliRunner>, project: &str, name: &str) -> Self {
        Self {
            cli,
            project: project.to_string(),
            name: name.to_string(),
        }
    }
}

impl Provision for PubsubTopic {
    fn kind(&self) -> &'static str {
        "channel"
    }

    fn describe(&self) -> String {
        format!("Pub/Sub topic {}", self.name)
    }

    fn probe(&self, _ctx: &RunContext) -> Result<ProbedState> {
        let probed = self
            .cli
            .probe_json(
                Tool::Gcloud,
                &[
                    "pubsub",
                    "topics",
                    "describe",
                    &self.name,
                    "--project",
                    &self.project,
                    "--format=json",
                ],
                &self.name,
            )
            .map_err(|e| probe_error(&self.name, &e))?;

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
                    "pubsub",
                    "topics",
                    "create",
                    &self.name,
                    "--project",
                    &self.project,
                ],
                Some(&self.name),
            )
            .map_err(|e| apply_error(&self.name, &e))?;
        Ok(())
    }
}
