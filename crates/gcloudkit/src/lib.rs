//! # gcloudkit
//!
//! Thin wrapper over the Google Cloud management CLIs (`gcloud`, `bq`).
//!
//! The crate does three things:
//!
//! - locates the CLI binaries and executes invocations ([`GcloudCli`])
//! - classifies CLI stderr into an error taxonomy ([`Error`]), so callers
//!   can tell "not found" (a normal probe result) from "could not reach
//!   the service" (a transport failure)
//! - abstracts execution behind a trait ([`CliRunner`]) so reconciliation
//!   logic can be exercised against a fake in tests
//!
//! It deliberately knows nothing about which resources exist or in what
//! order they are provisioned; that lives in the caller.

pub mod error;
pub mod runner;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use runner::{CliRunner, GcloudCli};
pub use types::{CommandOutput, Tool};
