//! Pipeline configuration.
//!
//! Everything the reconciler needs is carried explicitly in this struct;
//! there are no ambient project/credential lookups inside reconciliation
//! logic. Defaults match the resource names the pipeline's functions
//! expect in their environment.

use std::path::PathBuf;

/// Fully-resolved configuration for one pipeline deployment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Project name (not the numeric id; BigQuery needs the name)
    pub project: String,
    /// Region for functions, scheduler and bucket
    pub region: String,
    /// Cron expression for the extraction job
    pub schedule: String,
    /// Time zone the schedule is evaluated in
    pub time_zone: String,
    /// Short id of the pipeline service account
    pub service_account_id: String,
    /// Topic the extractor publishes raw observations to
    pub raw_topic: String,
    /// Dead-letter topic for undeliverable observations
    pub dead_letter_topic: String,
    /// Bronze-layer bucket for raw payloads
    pub bucket: String,
    /// Days after which bronze objects are deleted
    pub lifecycle_days: u32,
    /// BigQuery dataset
    pub dataset: String,
    /// BigQuery table for current conditions
    pub table: String,
    /// Extractor function name
    pub extractor: String,
    /// Processor function name
    pub processor: String,
    /// Scheduler job name
    pub job: String,
    /// Secret holding the weather API key
    pub secret: String,
    /// Directory containing the function sources (`extractor/`,
    /// `procesador/`)
    pub source_root: PathBuf,
    /// Functions runtime
    pub runtime: String,
}

impl PipelineConfig {
    /// Email of the pipeline service account.
    pub fn service_account_email(&self) -> String {
        format!(
            "{}@{}.iam.gserviceaccount.com",
            self.service_account_id, self.project
        )
    }

    /// Service agent Cloud Scheduler acts as, given the project's
    /// numeric id.
    pub fn scheduler_agent(project_number: &str) -> String {
        format!("service-{project_number}@gcp-sa-cloudscheduler.iam.gserviceaccount.com")
    }

    /// Fully-qualified table id (`project:dataset.table`, bq style).
    pub fn table_id(&self) -> String {
        format!("{}:{}.{}", self.project, self.dataset, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            project: "demo-proj".into(),
            region: "us-central1".into(),
            schedule: "0 * * * *".into(),
            time_zone: "America/Santiago".into(),
            service_account_id: "clima-pipeline".into(),
            raw_topic: "clima-datos-crudos".into(),
            dead_letter_topic: "clima-datos-crudos-dlq".into(),
            bucket: "datos-clima-bronce".into(),
            lifecycle_days: 90,
            dataset: "clima".into(),
            table: "condiciones_actuales".into(),
            extractor: "clima-extractor".into(),
            processor: "clima-procesador".into(),
            job: "clima-extraccion-programada".into(),
            secret: "clima-api-key".into(),
            source_root: PathBuf::from("."),
            runtime: "python312".into(),
        }
    }

    #[test]
    fn service_account_email_is_project_scoped() {
        assert_eq!(
            config().service_account_email(),
            "clima-pipeline@demo-proj.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn scheduler_agent_uses_project_number() {
        assert_eq!(
            PipelineConfig::scheduler_agent("247279804834"),
            "service-247279804834@gcp-sa-cloudscheduler.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn table_id_is_bq_style() {
        assert_eq!(config().table_id(), "demo-proj:clima.condiciones_actuales");
    }
}
