//! Dispatcher capability - how the engine asks the backend to act.
//!
//! The engine never creates or destroys resources itself; it asks an
//! implementation of [`ResourceActionDispatcher`] to do so. Keeping the
//! capability behind a two-operation trait lets the engine be tested
//! against an in-memory fake with no real backend involved.

use crate::planner::StepTarget;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A concrete property value to write on the target resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyWrite {
    pub name: String,
    pub value: Value,
}

impl PropertyWrite {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Outcome of an invoked resource action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeOutcome {
    Succeeded,
    /// The backend refused the action (validation rejection, unknown
    /// target). Distinct from a transport error, which is an `Err`.
    Rejected { reason: String },
}

/// Capability interface to the provisioning backend.
///
/// Implementations must either serialize concurrent writes to the same
/// target resource or signal a conflict the caller can retry as a fresh
/// plan; the engine's read-then-patch-then-write sequence on shared
/// array properties depends on it.
pub trait ResourceActionDispatcher: Send + Sync {
    /// Current value of an array-typed property on the target. An unset
    /// property reads as an empty array.
    fn fetch_property(&self, target: &StepTarget, property: &str) -> Result<Vec<Value>>;

    /// Ask the backend to invoke `action` on the target with the given
    /// property writes applied. Blocks until the backend reports a
    /// terminal outcome; cancellation and timeouts are the
    /// implementation's responsibility.
    fn invoke(
        &self,
        target: &StepTarget,
        action: &str,
        writes: &[PropertyWrite],
    ) -> Result<InvokeOutcome>;
}
