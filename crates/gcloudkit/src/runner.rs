//! Command execution against the real Google Cloud CLIs.

use crate::error::{Error, Result};
use crate::types::{CommandOutput, Tool};
use std::process::Command;

/// Executes management-CLI invocations.
///
/// The reconciler talks to the cloud exclusively through this trait, so
/// tests substitute a fake that records calls and replays canned output.
pub trait CliRunner: Send + Sync + std::fmt::Debug {
    /// Run a CLI command and capture its output.
    fn run(&self, tool: Tool, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command, classifying a non-zero exit into an [`Error`].
    ///
    /// `resource` names the resource the call is about, for error context.
    fn run_checked(&self, tool: Tool, args: &[&str], resource: Option<&str>) -> Result<String> {
        let output = self.run(tool, args)?;
        if !output.success {
            return Err(Error::from_cli_output(&output.stderr_str(), resource));
        }
        Ok(output.stdout_str())
    }

    /// Run a command expected to print JSON and parse its stdout.
    fn run_json(
        &self,
        tool: Tool,
        args: &[&str],
        resource: Option<&str>,
    ) -> Result<serde_json::Value> {
        let stdout = self.run_checked(tool, args, resource)?;
        if stdout.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(stdout.trim())?)
    }

    /// Read-only existence probe.
    ///
    /// Returns `Ok(Some(json))` when the describe call succeeds,
    /// `Ok(None)` when the resource does not exist, and an error for
    /// anything else; a failed call is never assumed to mean absent.
    fn probe_json(
        &self,
        tool: Tool,
        args: &[&str],
        resource: &str,
    ) -> Result<Option<serde_json::Value>> {
        match self.run_json(tool, args, Some(resource)) {
            Ok(json) => Ok(Some(json)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Runner backed by the installed `gcloud` and `bq` binaries.
#[derive(Debug)]
pub struct GcloudCli {
    gcloud_path: String,
    bq_path: String,
}

impl GcloudCli {
    /// Locate the CLIs on PATH.
    ///
    /// `bq` ships with the SDK, but is resolved separately because some
    /// minimal installs omit it.
    pub fn discover() -> Result<Self> {
        Ok(Self {
            gcloud_path: find_binary("gcloud")?,
            bq_path: find_binary("bq")?,
        })
    }

    fn path_for(&self, tool: Tool) -> &str {
        match tool {
            Tool::Gcloud => &self.gcloud_path,
            Tool::Bq => &self.bq_path,
        }
    }
}

impl CliRunner for GcloudCli {
    fn run(&self, tool: Tool, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(self.path_for(tool))
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                message: format!("failed to execute {}: {e}", tool.binary()),
                stderr: String::new(),
            })?;
        Ok(output.into())
    }
}

/// Find a binary on PATH, checking common SDK install locations first.
fn find_binary(name: &'static str) -> Result<String> {
    let candidates = [
        format!("/usr/bin/{name}"),
        format!("/usr/local/bin/{name}"),
        format!("/opt/google-cloud-sdk/bin/{name}"),
        format!("/snap/bin/{name}"),
    ];

    for path in &candidates {
        if std::path::Path::new(path).exists() {
            return Ok(path.clone());
        }
    }

    let output = Command::new("which")
        .arg(name)
        .output()
        .map_err(|_| Error::ToolNotFound { tool: name })?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Ok(path);
        }
    }

    Err(Error::ToolNotFound { tool: name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct ScriptedRunner {
        responses: Mutex<Vec<CommandOutput>>,
    }

    impl ScriptedRunner {
        fn with(responses: Vec<CommandOutput>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    impl CliRunner for ScriptedRunner {
        fn run(&self, _tool: Tool, _args: &[&str]) -> Result<CommandOutput> {
            let mut responses = self.responses.lock().unwrap();
            Ok(responses.remove(0))
        }
    }

    #[test]
    fn run_checked_classifies_failures() {
        let runner = ScriptedRunner::with(vec![CommandOutput::failed(
            "ERROR: NOT_FOUND: Resource 'topic' was not found",
        )]);
        let err = runner
            .run_checked(Tool::Gcloud, &["pubsub", "topics", "describe"], Some("topic"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn probe_maps_not_found_to_none() {
        let runner = ScriptedRunner::with(vec![CommandOutput::failed(
            "ERROR: NOT_FOUND: topic does not exist",
        )]);
        let probed = runner
            .probe_json(Tool::Gcloud, &["pubsub", "topics", "describe"], "topic")
            .unwrap();
        assert!(probed.is_none());
    }

    #[test]
    fn probe_surfaces_transport_errors() {
        let runner = ScriptedRunner::with(vec![CommandOutput::failed(
            "ERROR: There was a problem refreshing your current auth tokens",
        )]);
        let err = runner
            .probe_json(Tool::Gcloud, &["pubsub", "topics", "describe"], "topic")
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn probe_returns_parsed_json() {
        let runner = ScriptedRunner::with(vec![CommandOutput::ok(r#"{"name": "t"}"#)]);
        let probed = runner
            .probe_json(Tool::Gcloud, &["pubsub", "topics", "describe"], "topic")
            .unwrap()
            .unwrap();
        assert_eq!(probed["name"], "t");
    }

    #[test]
    fn run_json_tolerates_empty_stdout() {
        let runner = ScriptedRunner::with(vec![CommandOutput::ok("")]);
        let json = runner
            .run_json(Tool::Gcloud, &["projects", "describe"], None)
            .unwrap();
        assert!(json.is_null());
    }
}
