//! # Pipeline
//!
//! Resolution and patch engine for declarative deployment templates.
//!
//! Template documents embed a `pipeline` block describing extra
//! orchestration steps to run against other, already-deployed resources
//! whenever a resource of that template changes lifecycle state. The
//! canonical example: installing a workspace appends a rule scoped to
//! its address space to a shared firewall's rule collection; deleting
//! the workspace removes exactly that rule, without disturbing rules
//! belonging to other workspaces.
//!
//! ## Core Concepts
//!
//! - **Expression resolution**: `{{ … }}` placeholders in step values
//!   resolve against the triggering resource - and only the triggering
//!   resource ([`expression`]).
//! - **Array patching**: shared array properties are patched by a
//!   declared match field, idempotently, preserving untouched elements
//!   ([`patch`]).
//! - **Planning**: a lifecycle event expands into an ordered
//!   [`ExecutionPlan`] with the self step first on install/upgrade and
//!   last on uninstall ([`planner`]).
//! - **Execution**: the plan is driven step by step against a
//!   [`ResourceActionDispatcher`]; a failure halts the run and reports
//!   partial completion ([`executor`]).
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{execute_simple, plan, LifecycleAction};
//!
//! let definition = template.pipeline.unwrap_or_default();
//! let execution_plan = plan(LifecycleAction::Install, &definition, &trigger)?;
//! let result = execute_simple(&execution_plan, &dispatcher);
//! if !result.is_success() {
//!     eprintln!("halted at {:?}: {:?}", result.failed_step, result.cause);
//! }
//! ```
//!
//! The dispatcher is a capability trait with two operations (read an
//! array property, invoke an action), so the engine runs unchanged
//! against a real provisioning backend or an in-memory fake in tests.

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod expression;
pub mod patch;
pub mod planner;
pub mod types;

// Re-export main types at crate root
pub use dispatch::{InvokeOutcome, PropertyWrite, ResourceActionDispatcher};
pub use error::{Error, Result};
pub use executor::{execute, execute_simple, NoObserver, StepObserver};
pub use patch::ArraySubstitution;
pub use planner::{
    plan, validate_definition, ExecutionPlan, PatchOperation, PlannedStep, ResolvedPatch,
    StepTarget,
};
pub use types::{
    LifecycleAction, PipelineDefinition, PipelineResult, PropertyKind, PropertyPatch,
    ResourceInstance, ResourceKind, RunStatus, StepSpec, SELF_STEP_ID,
};
