//! Bronze-layer storage bucket resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, Result, RunContext};
use std::io::Write;
use std::sync::Arc;

use super::{apply_error, probe_error};

/// Bucket for raw weather payloads, with an age-based delete rule so the
/// bronze layer does not grow without bound.
#[derive(Debug)]
pub struct StorageBucket {
    cli: Arc<dyn CliRunner>,
    project: String,
    name: String,
    location: String,
    lifecycle_days: u32,
}

impl StorageBucket {
    pub fn new(
        cli: Arc<dyn CliRunner>,
        project: &str,
        name: &str,
        location: &str,
        lifecycle_days: u32,
    ) -> Self {
        Self {
            cli,
            project: project.to_string(),
            name: name.to_string(),
            location: location.to_string(),
            lifecycle_days,
        }
    }

    fn url(&self) -> String {
        format!("gs://{}", self.name)
    }

    fn lifecycle_json(&self) -> String {
        format!(
            r#"{{"rule": [{{"action": {{"type": "Delete"}}, "condition": {{"age": {}}}}}]}}"#,
            self.lifecycle_days
        )
    }

    fn has_delete_rule(&self, described: &serde_json::Value) -> bool {
        // gcloud has printed this under both names across releases.
        let rules = described["lifecycle_config"]["rule"]
            .as_array()
            .or_else(|| described["lifecycle"]["rule"].as_array());

        rules.is_some_and(|rules| {
            rules.iter().any(|r| {
                r["action"]["type"].as_str() == Some("Delete")
                    && r["condition"]["age"].as_u64() == Some(u64::from(self.lifecycle_days))
            })
        })
    }
}

impl Provision for StorageBucket {
    fn kind(&self) -> &'static str {
        "bucket"
    }

    fn describe(&self) -> String {
        format!(
            "Bucket {} ({}d lifecycle)",
            self.url(),
            self.lifecycle_days
        )
    }

    fn probe(&self, _ctx: &RunContext) -> Result<ProbedState> {
        let url = self.url();
        let probed = self
            .cli
            .probe_json(
                Tool::Gcloud,
                &["storage", "buckets", "describe", &url, "--format=json"],
                &url,
            )
            .map_err(|e| probe_error(&self.name, &e))?;

        Ok(match probed {
            Some(described) if self.has_delete_rule(&described) => ProbedState::present(),
            Some(_) => ProbedState::diverging(format!(
                "no {}-day delete rule on the live bucket",
                self.lifecycle_days
            )),
            None => ProbedState::Absent,
        })
    }

    fn create(&self, _ctx: &RunContext) -> Result<()> {
        let url = self.url();
        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "storage",
                    "buckets",
                    "create",
                    &url,
                    "--project",
                    &self.project,
                    &format!("--location={}", self.location),
                    "--uniform-bucket-level-access",
                ],
                Some(&self.name),
            )
            .map_err(|e| apply_error(&self.name, &e))?;

        // The lifecycle policy is plain configuration handed to the
        // managed service; the CLI only accepts it from a file.
        let mut policy = tempfile::NamedTempFile::new()
            .map_err(|e| reconcile::ReconcileError::apply_failure(&self.name, e))?;
        policy
            .write_all(self.lifecycle_json().as_bytes())
            .map_err(|e| reconcile::ReconcileError::apply_failure(&self.name, e))?;

        self.cli
            .run_checked(
                Tool::Gcloud,
                &[
                    "storage",
                    "buckets",
                    "update",
                    &url,
                    &format!("--lifecycle-file={}", policy.path().display()),
                ],
                Some(&self.name),
            )
            .map_err(|e| apply_error(&self.name, &e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeCli;

    fn bucket(cli: &Arc<FakeCli>) -> StorageBucket {
        StorageBucket::new(cli.clone(), "demo-proj", "datos-clima-bronce", "us-central1", 90)
    }

    #[test]
    fn absent_on_not_found() {
        let cli = Arc::new(FakeCli::new().fail(
            &["buckets", "describe"],
            "ERROR: gs://datos-clima-bronce not found: 404",
        ));
        assert_eq!(
            bucket(&cli).probe(&RunContext::new()).unwrap(),
            ProbedState::Absent
        );
    }

    #[test]
    fn matching_when_delete_rule_present() {
        let cli = Arc::new(FakeCli::new().ok(
            &["buckets", "describe"],
            r#"{"lifecycle_config": {"rule": [{"action": {"type": "Delete"}, "condition": {"age": 90}}]}}"#,
        ));
        assert_eq!(
            bucket(&cli).probe(&RunContext::new()).unwrap(),
            ProbedState::present()
        );
    }

    #[test]
    fn diverging_when_lifecycle_missing() {
        let cli = Arc::new(
            FakeCli::new().ok(&["buckets", "describe"], r#"{"name": "datos-clima-bronce"}"#),
        );
        let state = bucket(&cli).probe(&RunContext::new()).unwrap();
        assert!(matches!(state, ProbedState::Present { diverging: true, .. }));
    }

    #[test]
    fn diverging_when_age_differs() {
        let cli = Arc::new(FakeCli::new().ok(
            &["buckets", "describe"],
            r#"{"lifecycle_config": {"rule": [{"action": {"type": "Delete"}, "condition": {"age": 30}}]}}"#,
        ));
        let state = bucket(&cli).probe(&RunContext::new()).unwrap();
        assert!(matches!(state, ProbedState::Present { diverging: true, .. }));
    }

    #[test]
    fn create_makes_bucket_then_sets_lifecycle() {
        let cli = Arc::new(
            FakeCli::new()
                .ok(&["buckets", "create"], "")
                .ok(&["buckets", "update"], ""),
        );
        bucket(&cli).create(&RunContext::new()).unwrap();
        assert_eq!(
            cli.calls_matching(&["buckets", "create", "gs://datos-clima-bronce"]),
            1
        );
        assert_eq!(cli.calls_matching(&["buckets", "update"]), 1);
    }
}
