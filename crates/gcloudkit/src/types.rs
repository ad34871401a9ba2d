//! Shared types for CLI invocations.

use std::process::Output;

/// The management CLI a call goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// `gcloud`: IAM, Pub/Sub, Storage, Functions, Scheduler, Secrets
    Gcloud,
    /// `bq`: BigQuery datasets and tables
    Bq,
}

impl Tool {
    /// Binary name of this tool.
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Gcloud => "gcloud",
            Tool::Bq => "bq",
        }
    }
}

/// Captured output from a CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Build a successful output with the given stdout (used by fakes).
    pub fn ok(stdout: &str) -> Self {
        Self {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            success: true,
        }
    }

    /// Build a failed output with the given stderr (used by fakes).
    pub fn failed(stderr: &str) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
            success: false,
        }
    }

    /// Get stdout as a string.
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string.
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}
