//! # reconcile
//!
//! An idempotent provisioning reconciler: declare resources and their
//! dependencies, probe remote state, create what is absent, skip what
//! already exists.
//!
//! ## Core concepts
//!
//! - **Declaration**: a desired resource: logical name, dependencies,
//!   required/best-effort, and a [`Provision`] carrying its behavior
//! - **Plan**: one ordered declaration list plus [`Gate`]s; entry points
//!   select sub-lists of it rather than duplicating scripts
//! - **RunContext**: ephemeral map of computed outputs threaded between
//!   declarations within one run
//! - **Executor**: walks the plan in topological order, sequentially,
//!   probing then applying each declaration exactly once
//!
//! ## Semantics
//!
//! The reconciler only ever creates. A present resource is skipped even
//! when its live configuration diverges from the declaration (a warning
//! is recorded); the one exception is [`PresentPolicy::Replace`], which
//! deletes and recreates a diverged resource (never an in-place
//! update) so the applied configuration always reflects the latest
//! resolved outputs.
//!
//! ```ignore
//! use reconcile::{Declaration, Plan, RunContext, execute, NoObserver};
//!
//! let mut plan = Plan::new();
//! plan.add(Declaration::new("topic.raw", Box::new(topic)));
//! plan.add(Declaration::new("function.processor", Box::new(processor))
//!     .depends_on(&["topic.raw"]));
//!
//! let mut ctx = RunContext::new();
//! let report = execute(&plan, &mut ctx, &mut NoObserver)?;
//! ```

pub mod context;
pub mod declaration;
pub mod error;
pub mod executor;
pub mod graph;
pub mod planner;
pub mod types;

pub use context::{NoObserver, Observer, RunContext};
pub use declaration::{Declaration, Precondition, Provision};
pub use error::{ReconcileError, Result};
pub use executor::execute;
pub use planner::{Gate, Plan};
pub use types::{ApplyOutcome, PresentPolicy, ProbedState, RunReport, StepReport};
