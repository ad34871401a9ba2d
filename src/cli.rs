use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::PipelineConfig;

#[derive(Parser)]
#[command(name = "climactl")]
#[command(version)]
#[command(about = "Provision, inspect and verify the clima weather pipeline", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile the pipeline (create what is missing, skip what exists)
    Deploy(DeployArgs),

    /// Probe every resource and report present/missing/diverging
    Status(StatusArgs),

    /// Trigger one extraction and summarize pipeline health signals
    Verify(VerifyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Where the pipeline lives and what its resources are called.
#[derive(Args)]
pub struct SiteArgs {
    /// Project that hosts the pipeline
    pub project: String,

    /// Region for functions, scheduler and bucket
    #[arg(default_value = "us-central1")]
    pub region: String,

    /// Cron expression for the extraction job
    #[arg(long, env = "CLIMA_SCHEDULE", default_value = "0 * * * *")]
    pub schedule: String,

    /// Time zone the schedule is evaluated in
    #[arg(long, env = "CLIMA_TIME_ZONE", default_value = "America/Santiago")]
    pub time_zone: String,

    /// Service account id for the pipeline identity
    #[arg(long, default_value = "clima-pipeline")]
    pub service_account: String,

    /// Topic for raw weather observations
    #[arg(long, default_value = "clima-datos-crudos")]
    pub topic: String,

    /// Dead-letter topic for undeliverable observations
    #[arg(long, default_value = "clima-datos-crudos-dlq")]
    pub dead_letter_topic: String,

    /// Bronze-layer bucket for raw payloads
    #[arg(long, default_value = "datos-clima-bronce")]
    pub bucket: String,

    /// Days before bronze objects are deleted
    #[arg(long, default_value_t = 90)]
    pub lifecycle_days: u32,

    /// BigQuery dataset
    #[arg(long, default_value = "clima")]
    pub dataset: String,

    /// BigQuery table for current conditions
    #[arg(long, default_value = "condiciones_actuales")]
    pub table: String,

    /// Extractor function name
    #[arg(long, default_value = "clima-extractor")]
    pub extractor: String,

    /// Processor function name
    #[arg(long, default_value = "clima-procesador")]
    pub processor: String,

    /// Scheduler job name
    #[arg(long, default_value = "clima-extraccion-programada")]
    pub job: String,

    /// Secret holding the weather API key
    #[arg(long, default_value = "clima-api-key")]
    pub secret: String,

    /// Directory containing the function sources
    #[arg(long, default_value = ".")]
    pub source_root: PathBuf,

    /// Functions runtime
    #[arg(long, default_value = "python312")]
    pub runtime: String,
}

impl SiteArgs {
    pub fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            project: self.project,
            region: self.region,
            schedule: self.schedule,
            time_zone: self.time_zone,
            service_account_id: self.service_account,
            raw_topic: self.topic,
            dead_letter_topic: self.dead_letter_topic,
            bucket: self.bucket,
            lifecycle_days: self.lifecycle_days,
            dataset: self.dataset,
            table: self.table,
            extractor: self.extractor,
            processor: self.processor,
            job: self.job,
            secret: self.secret,
            source_root: self.source_root,
            runtime: self.runtime,
        }
    }
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Reconcile only these declarations (plus their dependencies)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Probe only - show what would be created without applying
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Report only these declarations (plus their dependencies)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Seconds to wait after triggering before reading signals
    #[arg(long)]
    pub grace: Option<u64>,

    /// Read signals without triggering an extraction first
    #[arg(long)]
    pub no_trigger: bool,
}
