//! Pipeline execution - drives a plan against a dispatcher.
//!
//! Steps are dispatched strictly in plan order; each dispatcher call
//! blocks until it reports a terminal outcome, so a run moves
//! `Planned -> Executing(step) -> Completed | Failed(step)` with no
//! retries and no mid-run cancellation. A step failure halts the
//! remaining steps and the result reports partial completion; already
//! applied steps are never rolled back - recovery is a fresh run of the
//! same (idempotent) lifecycle action.

use crate::dispatch::{InvokeOutcome, PropertyWrite, ResourceActionDispatcher};
use crate::error::{Error, Result};
use crate::patch;
use crate::planner::{ExecutionPlan, PatchOperation, PlannedStep};
use crate::types::PipelineResult;
use serde_json::Value;

/// Observer for step transitions during a run.
///
/// Lets callers render progress without the engine depending on any
/// terminal or logging framework.
pub trait StepObserver {
    fn on_step_start(&mut self, index: usize, step: &PlannedStep);
    fn on_step_complete(&mut self, index: usize, step: &PlannedStep);
    fn on_step_failed(&mut self, index: usize, step: &PlannedStep, error: &Error);
}

/// No-op observer
pub struct NoObserver;

impl StepObserver for NoObserver {
    fn on_step_start(&mut self, _index: usize, _step: &PlannedStep) {}
    fn on_step_complete(&mut self, _index: usize, _step: &PlannedStep) {}
    fn on_step_failed(&mut self, _index: usize, _step: &PlannedStep, _error: &Error) {}
}

/// Execute a plan against a dispatcher, reporting step transitions to
/// the observer.
pub fn execute<D>(
    plan: &ExecutionPlan,
    dispatcher: &D,
    observer: &mut dyn StepObserver,
) -> PipelineResult
where
    D: ResourceActionDispatcher + ?Sized,
{
    let mut completed = Vec::with_capacity(plan.steps.len());

    for (index, step) in plan.steps.iter().enumerate() {
        observer.on_step_start(index, step);
        match execute_step(step, dispatcher) {
            Ok(()) => {
                observer.on_step_complete(index, step);
                completed.push(step.step_id.clone());
            }
            Err(error) => {
                observer.on_step_failed(index, step, &error);
                return PipelineResult::failed(completed, index, step.step_id.as_str(), error);
            }
        }
    }

    PipelineResult::completed(completed)
}

/// Execute a plan without progress reporting.
pub fn execute_simple<D>(plan: &ExecutionPlan, dispatcher: &D) -> PipelineResult
where
    D: ResourceActionDispatcher + ?Sized,
{
    execute(plan, dispatcher, &mut NoObserver)
}

/// Run a single step: materialize its property writes, then invoke.
///
/// Array patches are read-then-patch-then-write: the current value is
/// fetched from the dispatcher and the substitution applied to it, so
/// entries owned by other triggers survive as long as each dispatch is
/// transactional at the backend.
fn execute_step<D>(step: &PlannedStep, dispatcher: &D) -> Result<()>
where
    D: ResourceActionDispatcher + ?Sized,
{
    let mut writes = Vec::with_capacity(step.patches.len());
    for resolved in &step.patches {
        match &resolved.operation {
            PatchOperation::Set { value } => {
                writes.push(PropertyWrite::new(&resolved.property, value.clone()));
            }
            PatchOperation::Array {
                substitution,
                value,
            } => {
                let current = dispatcher
                    .fetch_property(&step.target, &resolved.property)
                    .map_err(|source| Error::Dispatch {
                        step_id: step.step_id.clone(),
                        message: format!(
                            "fetching property '{}': {source:#}",
                            resolved.property
                        ),
                    })?;
                let next = patch::apply(&resolved.property, &current, substitution, value)?;
                writes.push(PropertyWrite::new(&resolved.property, Value::Array(next)));
            }
        }
    }

    let outcome = dispatcher
        .invoke(&step.target, &step.action, &writes)
        .map_err(|source| Error::Dispatch {
            step_id: step.step_id.clone(),
            message: format!("{source:#}"),
        })?;

    match outcome {
        InvokeOutcome::Succeeded => Ok(()),
        InvokeOutcome::Rejected { reason } => Err(Error::Dispatch {
            step_id: step.step_id.clone(),
            message: format!("rejected by backend: {reason}"),
        }),
    }
}
