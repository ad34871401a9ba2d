//! Cloud Function (gen2) resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, ReconcileError, Result, RunContext};
use std::path::PathBuf;
use std::sync::Arc;

use super::{apply_error, probe_error};

/// How the function is invoked.
#[derive(Debug, Clone)]
pub enum FunctionTrigger {
    /// HTTP, authenticated callers only
    Http,
    /// Fired by messages on a topic
    Topic(String),
}

/// A deployed function: the extractor (HTTP, invoked by the scheduler)
/// or the processor (topic-triggered).
#[derive(Debug)]
pub struct CloudFunction {
    cli: Arc<dyn CliRunner>,
    project: String,
    region: String,
    name: String,
    runtime: String,
    source: PathBuf,
    entry_point: String,
    trigger: FunctionTrigger,
    service_account: String,
    env: Vec<(String, String)>,
    secret_env: Option<String>,
}

impl CloudFunction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cli: Arc<dyn CliRunner>,
        project: &str,
        region: &str,
        name: &str,
        runtime: &str,
        source: PathBuf,
        entry_point: &str,
        trigger: FunctionTrigger,
        service_account: &str,
    ) -> Self {
        Self {
            cli,
            project: project.to_string(),
            region: region.to_string(),
            name: name.to_string(),
            runtime: runtime.to_string(),
            source,
            entry_point: entry_point.to_string(),
            trigger,
            service_account: service_account.to_string(),
            env: Vec::new(),
            secret_env: None,
        }
    }

    /// Add an environment variable for the deployed function.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Mount a Secret Manager secret as an environment variable
    /// (`VAR=secret:version`).
    pub fn secret_env(mut self, binding: &str) -> Self {
        self.secret_env = Some(binding.to_string());
        self
    }

    fn describe_args(&self) -> Vec<String> {
        vec![
            "functions".into(),
            "describe".into(),
            self.name.clone(),
            "--project".into(),
            self.project.clone(),
            "--region".into(),
            self.region.clone(),
            "--gen2".into(),
            "--format=json".into(),
        ]
    }

    fn deploy_args(&self) -> Vec<String> {
        let mut args = vec![
            "functions".into(),
            "deploy".into(),
            self.name.clone(),
            "--gen2".into(),
            "--project".into(),
            self.project.clone(),
            "--region".into(),
            self.region.clone(),
            format!("--runtime={}", self.runtime),
            format!("--source={}", self.source.display()),
            format!("--entry-point={}", self.entry_point),
            format!("--service-account={}", self.service_account),
        ];
        match &self.trigger {
            FunctionTrigger::Http => {
                args.push("--trigger-http".into());
                args.push("--no-allow-unauthenticated".into());
            }
            FunctionTrigger::Topic(topic) => {
                args.push(format!("--trigger-topic={topic}"));
            }
        }
        if !self.env.is_empty() {
            let pairs: Vec<String> =
                self.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
            args.push(format!("--set-env-vars={}", pairs.join(",")));
        }
        if let Some(secret) = &self.secret_env {
            args.push(format!("--set-secrets={secret}"));
        }
        args
    }
}

impl Provision for CloudFunction {
    fn kind(&self) -> &'static str {
        "function"
    }

    fn describe(&self) -> String {
        let trigger = match &self.trigger {
            FunctionTrigger::Http => "http".to_string(),
            FunctionTrigger::Topic(t) => format!("topic {t}"),
        };
        format!("Function {} ({trigger})", self.name)
    }

    fn probe(&self, _ctx: &RunContext) -> Result<ProbedState> {
        let args = self.describe_args();
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let probed = self
            .cli
            .probe_json(Tool::Gcloud, &argv, &self.name)
            .map_err(|e| probe_error(&self.name, &e))?;

        Ok(match probed {
            Some(_) => ProbedState::present(),
            None => ProbedState::Absent,
        })
    }

    fn create(&self, _ctx: &RunContext) -> Result<()> {
        let args = self.deploy_args();
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        self.cli
            .run_checked(Tool::Gcloud, &argv, Some(&self.name))
            .map_err(|e| apply_error(&self.name, &e))?;
        Ok(())
    }

    fn outputs(&self, _ctx: &RunContext) -> Result<Vec<(String, String)>> {
        // Only HTTP functions have a caller-facing URL.
        if !matches!(self.trigger, FunctionTrigger::Http) {
            return Ok(Vec::new());
        }

        let args = self.describe_args();
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let described = self
            .cli
            .run_json(Tool::Gcloud, &argv, Some(&self.name))
            .map_err(|e| probe_error(&self.name, &e))?;

        let url = described["serviceConfig"]["uri"]
            .as_str()
            .or_else(|| described["url"].as_str())
            .ok_or_else(|| {
                ReconcileError::apply_failure(
                    &self.name,
                    "deployed function did not report an invocation URL",
                )
            })?;

        Ok(vec![("invocation_url".to_string(), url.to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeCli;

    fn extractor(cli: &Arc<FakeCli>) -> CloudFunction {
        CloudFunction::new(
            cli.clone(),
            "demo-proj",
            "us-central1",
            "clima-extractor",
            "python312",
            PathBuf::from("./extractor"),
            "extraer_clima",
            FunctionTrigger::Http,
            "clima-pipeline@demo-proj.iam.gserviceaccount.com",
        )
        .env("GCP_PROJECT", "demo-proj")
        .secret_env("WEATHER_API_KEY=clima-api-key:latest")
    }

    fn processor(cli: &Arc<FakeCli>) -> CloudFunction {
        CloudFunction::new(
            cli.clone(),
            "demo-proj",
            "us-central1",
            "clima-procesador",
            "python312",
            PathBuf::from("./procesador"),
            "procesar_clima",
            FunctionTrigger::Topic("clima-datos-crudos".into()),
            "clima-pipeline@demo-proj.iam.gserviceaccount.com",
        )
    }

    #[test]
    fn absent_when_not_deployed() {
        let cli = Arc::new(FakeCli::new().fail(
            &["functions", "describe"],
            "ERROR: NOT_FOUND: function clima-extractor does not exist",
        ));
        assert_eq!(
            extractor(&cli).probe(&RunContext::new()).unwrap(),
            ProbedState::Absent
        );
    }

    #[test]
    fn deploy_uses_http_trigger_without_public_access() {
        let cli = Arc::new(FakeCli::new().ok(&["functions", "deploy"], ""));
        extractor(&cli).create(&RunContext::new()).unwrap();
        assert_eq!(cli.calls_matching(&["--trigger-http", "--no-allow-unauthenticated"]), 1);
        assert_eq!(cli.calls_matching(&["--set-env-vars=GCP_PROJECT=demo-proj"]), 1);
        assert_eq!(
            cli.calls_matching(&["--set-secrets=WEATHER_API_KEY=clima-api-key:latest"]),
            1
        );
    }

    #[test]
    fn deploy_uses_topic_trigger_for_processor() {
        let cli = Arc::new(FakeCli::new().ok(&["functions", "deploy"], ""));
        processor(&cli).create(&RunContext::new()).unwrap();
        assert_eq!(cli.calls_matching(&["--trigger-topic=clima-datos-crudos"]), 1);
    }

    #[test]
    fn outputs_surface_the_run_url() {
        let cli = Arc::new(FakeCli::new().ok(
            &["functions", "describe"],
            r#"{"serviceConfig": {"uri": "https://clima-extractor-h2x4a-uc.a.run.app"}}"#,
        ));
        let outputs = extractor(&cli).outputs(&RunContext::new()).unwrap();
        assert_eq!(
            outputs,
            vec![(
                "invocation_url".to_string(),
                "https://clima-extractor-h2x4a-uc.a.run.app".to_string()
            )]
        );
    }

    #[test]
    fn topic_functions_publish_no_url() {
        let cli = Arc::new(FakeCli::new());
        assert!(processor(&cli).outputs(&RunContext::new()).unwrap().is_empty());
    }

    #[test]
    fn missing_url_in_describe_is_an_error() {
        let cli = Arc::new(FakeCli::new().ok(&["functions", "describe"], "{}"));
        assert!(extractor(&cli).outputs(&RunContext::new()).is_err());
    }
}
