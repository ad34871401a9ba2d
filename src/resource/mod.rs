//! Resource kinds the reconciler can manage.
//!
//! Each type wraps the management-CLI calls for one kind of resource:
//! a read-only probe, a create, and (for the scheduler job) a delete.
//! Deciding whether to act belongs to the executor, not to these types.

use reconcile::ReconcileError;

/// Map a CLI error from a probe into the reconciler taxonomy.
///
/// By the time this runs, "not found" has already been turned into a
/// normal Absent result; whatever is left means state is unknown.
pub(crate) fn probe_error(name: &str, err: &gcloudkit::Error) -> ReconcileError {
    ReconcileError::probe_transport(name, err)
}

/// Map a CLI error from a mutating call into the reconciler taxonomy.
pub(crate) fn apply_error(name: &str, err: &gcloudkit::Error) -> ReconcileError {
    ReconcileError::apply_failure(name, err)
}

pub mod bigquery_table;
pub mod cloud_function;
pub mod pubsub_topic;
pub mod role_binding;
pub mod scheduler_job;
pub mod secret_gate;
pub mod service_account;
pub mod storage_bucket;
pub mod token_grant;

pub use bigquery_table::BigQueryTable;
pub use cloud_function::{CloudFunction, FunctionTrigger};
pub use pubsub_topic::PubsubTopic;
pub use role_binding::RoleBinding;
pub use scheduler_job::SchedulerJob;
pub use secret_gate::SecretGate;
pub use service_account::ServiceAccount;
pub use storage_bucket::StorageBucket;
pub use token_grant::TokenGrant;
