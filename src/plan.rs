//! The pipeline's declaration list.
//!
//! One plan describes every managed resource; "deploy", "repair" and
//! "redeploy one function" are selections over it. Dependencies are
//! explicit data here, not script order.

use gcloudkit::{CliRunner, Tool};
use reconcile::{Declaration, Gate, Plan, ReconcileError, Result, RunContext};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::resource::{
    BigQueryTable, CloudFunction, FunctionTrigger, PubsubTopic, RoleBinding, SchedulerJob,
    SecretGate, ServiceAccount, StorageBucket, TokenGrant,
};

/// Logical names of the pipeline's declarations.
pub mod names {
    pub const SERVICE_ACCOUNT: &str = "service-account";
    pub const TOPIC_RAW: &str = "topic.raw";
    pub const TOPIC_DEAD_LETTER: &str = "topic.dead-letter";
    pub const BUCKET: &str = "bucket.bronze";
    pub const TABLE: &str = "table.conditions";
    pub const EXTRACTOR: &str = "function.extractor";
    pub const PROCESSOR: &str = "function.processor";
    pub const TOKEN_GRANT: &str = "grant.scheduler-token-creator";
    pub const JOB: &str = "job.extraction";
}

/// Roles the pipeline service account needs on the project.
const PROJECT_ROLES: [(&str, &str); 4] = [
    ("binding.pubsub-publisher", "roles/pubsub.publisher"),
    ("binding.storage-object-admin", "roles/storage.objectAdmin"),
    ("binding.bigquery-data-editor", "roles/bigquery.dataEditor"),
    ("binding.secret-accessor", "roles/secretmanager.secretAccessor"),
];

/// Look up the project's numeric id.
///
/// Done once, up front, by the command layer; reconciliation logic only
/// ever sees the value through the run context.
pub fn lookup_project_number(cli: &dyn CliRunner, project: &str) -> Result<String> {
    let looked_up = cli.run_checked(
        Tool::Gcloud,
        &[
            "projects",
            "describe",
            project,
            "--format=value(projectNumber)",
        ],
        Some(project),
    );

    match looked_up {
        Ok(number) if !number.trim().is_empty() => Ok(number.trim().to_string()),
        Ok(_) => Err(ReconcileError::probe_transport(
            project,
            "project describe returned no project number",
        )),
        Err(err) if err.is_not_found() => Err(ReconcileError::precondition(
            format!("project {project} does not exist or is not visible to these credentials"),
            vec![format!("gcloud projects create {project}")],
        )),
        Err(err) => Err(ReconcileError::probe_transport(project, err)),
    }
}

/// Seed a fresh run context with the values later declarations template
/// over.
pub fn seed_context(cfg: &PipelineConfig, project_number: &str) -> RunContext {
    let mut ctx = RunContext::new();
    ctx.insert("project", "id", &cfg.project);
    ctx.insert("project", "number", project_number);
    ctx.insert("project", "region", &cfg.region);
    ctx
}

/// Build the full nine-step plan for one pipeline.
pub fn build_plan(cfg: &PipelineConfig, cli: &Arc<dyn CliRunner>) -> Plan {
    let sa_email = cfg.service_account_email();
    let sa_member = format!("serviceAccount:{sa_email}");
    let mut plan = Plan::new();

    plan.add(Declaration::new(
        names::SERVICE_ACCOUNT,
        Box::new(ServiceAccount::new(
            cli.clone(),
            &cfg.project,
            &cfg.service_account_id,
            "Clima pipeline",
        )),
    ));

    for (name, role) in PROJECT_ROLES {
        plan.add(
            Declaration::new(
                name,
                Box::new(RoleBinding::new(cli.clone(), &cfg.project, &sa_member, role)),
            )
            .depends_on(&[names::SERVICE_ACCOUNT]),
        );
    }

    plan.add(Declaration::new(
        names::TOPIC_RAW,
        Box::new(PubsubTopic::new(cli.clone(), &cfg.project, &cfg.raw_topic)),
    ));
    plan.add(Declaration::new(
        names::TOPIC_DEAD_LETTER,
        Box::new(PubsubTopic::new(
            cli.clone(),
            &cfg.project,
            &cfg.dead_letter_topic,
        )),
    ));

    plan.add(Declaration::new(
        names::BUCKET,
        Box::new(StorageBucket::new(
            cli.clone(),
            &cfg.project,
            &cfg.bucket,
            &cfg.region,
            cfg.lifecycle_days,
        )),
    ));

    plan.add(Declaration::new(
        names::TABLE,
        Box::new(BigQueryTable::new(
            cli.clone(),
            &cfg.project,
            &cfg.dataset,
            &cfg.table,
            &cfg.region,
        )),
    ));

    plan.add(
        Declaration::new(
            names::EXTRACTOR,
            Box::new(
                CloudFunction::new(
                    cli.clone(),
                    &cfg.project,
                    &cfg.region,
                    &cfg.extractor,
                    &cfg.runtime,
                    cfg.source_root.join("extractor"),
                    "extraer_clima",
                    FunctionTrigger::Http,
                    &sa_email,
                )
                .env("GCP_PROJECT", &cfg.project)
                .secret_env(&format!("WEATHER_API_KEY={}:latest", cfg.secret)),
            ),
        )
        .depends_on(&[names::SERVICE_ACCOUNT]),
    );

    plan.add(
        Declaration::new(
            names::PROCESSOR,
            Box::new(
                CloudFunction::new(
                    cli.clone(),
                    &cfg.project,
                    &cfg.region,
                    &cfg.processor,
                    &cfg.runtime,
                    cfg.source_root.join("procesador"),
                    "procesar_clima",
                    FunctionTrigger::Topic(cfg.raw_topic.clone()),
                    &sa_email,
                )
                .env("GCP_PROJECT", &cfg.project)
                .env("BUCKET_CLIMA", &cfg.bucket)
                .env("DATASET_CLIMA", &cfg.dataset)
                .env("TABLA_CLIMA", &cfg.table),
            ),
        )
        .depends_on(&[
            names::SERVICE_ACCOUNT,
            names::TOPIC_RAW,
            names::BUCKET,
            names::TABLE,
        ]),
    );

    plan.add(
        Declaration::new(
            names::TOKEN_GRANT,
            Box::new(TokenGrant::new(
                cli.clone(),
                &sa_email,
                "serviceAccount:service-${project.number}@gcp-sa-cloudscheduler.iam.gserviceaccount.com",
            )),
        )
        .depends_on(&[names::SERVICE_ACCOUNT])
        .best_effort(),
    );

    plan.add(
        Declaration::new(
            names::JOB,
            Box::new(SchedulerJob::new(
                cli.clone(),
                &cfg.project,
                &cfg.region,
                &cfg.job,
                &cfg.schedule,
                &cfg.time_zone,
                &format!("${{{}.invocation_url}}", names::EXTRACTOR),
                &sa_email,
            )),
        )
        .depends_on(&[names::EXTRACTOR, names::SERVICE_ACCOUNT]),
    );

    plan.add_gate(Gate::new(
        Box::new(SecretGate::new(cli.clone(), &cfg.project, &cfg.secret)),
        &[
            names::EXTRACTOR,
            names::PROCESSOR,
            names::TOKEN_GRANT,
            names::JOB,
        ],
    ));

    plan
}
