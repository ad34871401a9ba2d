//! Error types for Google Cloud CLI operations.
//!
//! Errors are categorized so callers can distinguish "the resource is not
//! there" (a normal probe result) from "the call could not be completed"
//! (network, auth, quota). Each error carries enough context for an
//! actionable message.

use thiserror::Error;

/// Categories of CLI errors.
///
/// The category drives reconciliation decisions: `NotFound` maps to an
/// absent resource, `AlreadyExists` to a no-op create, and `Transport`
/// means the state could not be determined at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Resource does not exist (normal probe outcome, not a failure)
    NotFound,
    /// Resource already exists (create raced or was re-run)
    AlreadyExists,
    /// Caller lacks permission on the resource or API
    Permission,
    /// Network, auth-refresh, or service availability problem
    Transport,
    /// Request was structurally rejected (bad flag, bad name)
    InvalidArgument,
    /// CLI binary missing or not configured
    ToolNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this category means the remote state is unknown rather
    /// than the operation being wrong.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Whether this error can be treated as "already converged".
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::AlreadyExists)
    }

    /// User-facing description of this category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Already exists",
            Self::Permission => "Permission denied",
            Self::Transport => "Could not reach the service",
            Self::InvalidArgument => "Request rejected",
            Self::ToolNotFound => "CLI not installed",
            Self::Other => "Unexpected error",
        }
    }
}

/// Errors from running the management CLIs.
#[derive(Debug, Error)]
pub enum Error {
    /// The CLI binary could not be found on PATH
    #[error("{tool} not found. Install the Google Cloud SDK from https://cloud.google.com/sdk")]
    ToolNotFound {
        /// Name of the missing binary
        tool: &'static str,
    },

    /// The resource named in the call does not exist
    #[error("not found: {resource}")]
    NotFound {
        /// Identifier of the missing resource
        resource: String,
    },

    /// The resource already exists
    #[error("already exists: {resource}")]
    AlreadyExists {
        /// Identifier of the pre-existing resource
        resource: String,
    },

    /// The caller is not allowed to perform the operation
    #[error("permission denied: {message}")]
    Permission {
        /// Detail from the service
        message: String,
    },

    /// The call could not be completed (network, auth refresh, outage)
    #[error("transport error: {message}")]
    Transport {
        /// Detail from the failed call
        message: String,
    },

    /// The service rejected the request as malformed
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Detail from the service
        message: String,
    },

    /// Command exited non-zero and stderr did not match a known pattern
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error from the command
        stderr: String,
    },

    /// IO error launching the command or handling files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output from the CLI could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ToolNotFound { .. } => ErrorCategory::ToolNotFound,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AlreadyExists { .. } => ErrorCategory::AlreadyExists,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::Transport { .. } | Error::Io(_) => ErrorCategory::Transport,
            Error::InvalidArgument { .. } => ErrorCategory::InvalidArgument,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether the remote state could not be determined.
    pub fn is_transport(&self) -> bool {
        self.category().is_transport()
    }

    /// Whether this error means the resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self.category(), ErrorCategory::NotFound)
    }

    /// Whether this error can be treated as "already converged".
    pub fn is_ignorable(&self) -> bool {
        self.category().is_ignorable()
    }

    /// Create an error from CLI output.
    ///
    /// Classifies stderr from `gcloud`/`bq` into a category. The patterns
    /// cover both the gRPC-style status names the APIs return and the
    /// prose variants the CLIs print.
    pub fn from_cli_output(stderr: &str, resource: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();
        let named = || resource.unwrap_or("resource").to_string();

        // Existence results come first: a NOT_FOUND is a normal probe
        // outcome and must never be mistaken for a transport problem.
        if stderr_lower.contains("not_found")
            || stderr_lower.contains("not found")
            || stderr_lower.contains("does not exist")
            || stderr_lower.contains("could not be found")
            || stderr_lower.contains("404")
        {
            return Error::NotFound { resource: named() };
        }

        if stderr_lower.contains("already_exists")
            || stderr_lower.contains("already exists")
            || stderr_lower.contains("duplicate")
            || stderr_lower.contains("409")
        {
            return Error::AlreadyExists { resource: named() };
        }

        if stderr_lower.contains("permission_denied")
            || stderr_lower.contains("permission denied")
            || stderr_lower.contains("does not have permission")
            || stderr_lower.contains("caller is missing")
            || stderr_lower.contains("403")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        // Auth-refresh failures count as transport: the state of the
        // remote resource is unknown, not absent.
        if stderr_lower.contains("could not resolve")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("connection reset")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("deadline_exceeded")
            || stderr_lower.contains("unavailable")
            || stderr_lower.contains("internal error")
            || stderr_lower.contains("500")
            || stderr_lower.contains("503")
            || stderr_lower.contains("network")
            || stderr_lower.contains("ssl")
            || stderr_lower.contains("certificate")
            || stderr_lower.contains("reauthentication")
            || stderr_lower.contains("invalid_grant")
            || stderr_lower.contains("could not refresh")
            || stderr_lower.contains("quota exceeded")
        {
            return Error::Transport {
                message: stderr.trim().to_string(),
            };
        }

        if stderr_lower.contains("invalid_argument")
            || stderr_lower.contains("invalid argument")
            || stderr_lower.contains("invalid value")
            || stderr_lower.contains("unrecognized arguments")
            || stderr_lower.contains("400")
        {
            return Error::InvalidArgument {
                message: stderr.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!(
                "command failed{}",
                resource.map(|r| format!(" for {r}")).unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;
