//! Error types for the pipeline engine.
//!
//! Planning errors are fatal before any dispatch happens; execution
//! errors halt the remaining steps of a run but never roll back steps
//! already applied. Every variant carries enough context for
//! operator-facing diagnostics.

use thiserror::Error;

/// Errors raised while planning or executing a pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The pipeline definition is structurally invalid (missing or
    /// duplicated self marker, incomplete dependent step, bad patch
    /// field pairing). Raised at plan time, never partially applied.
    #[error("malformed pipeline definition: {message}")]
    MalformedDefinition {
        /// What is wrong with the definition
        message: String,
    },

    /// An expression references a path absent on the trigger resource.
    /// Raised at plan time, before any dispatch.
    #[error("unresolved reference: '{path}' is not present on the trigger resource")]
    UnresolvedReference {
        /// The full placeholder path that failed to resolve
        path: String,
    },

    /// An array patch could not compute its match key from the resolved
    /// value. Fails the step it belongs to.
    #[error("patch conflict on property '{property}': {message}")]
    PatchConflict {
        /// Name of the array property being patched
        property: String,
        /// Why the match key could not be computed
        message: String,
    },

    /// The external dispatcher failed or rejected a step. Halts the
    /// remaining steps of the plan.
    #[error("dispatch failed for step '{step_id}': {message}")]
    Dispatch {
        /// Deterministic id of the failing step
        step_id: String,
        /// Failure detail reported by the dispatcher
        message: String,
    },
}

impl Error {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDefinition {
            message: message.into(),
        }
    }

    /// Whether this error is raised during planning, i.e. before any
    /// side effect has occurred.
    pub fn is_plan_time(&self) -> bool {
        matches!(
            self,
            Self::MalformedDefinition { .. } | Self::UnresolvedReference { .. }
        )
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_time_classification() {
        assert!(Error::malformed("no self step").is_plan_time());
        assert!(
            Error::UnresolvedReference {
                path: "resource.properties.missing".into()
            }
            .is_plan_time()
        );
        assert!(
            !Error::PatchConflict {
                property: "rule_collections".into(),
                message: "no match field".into()
            }
            .is_plan_time()
        );
        assert!(
            !Error::Dispatch {
                step_id: "s1".into(),
                message: "backend unreachable".into()
            }
            .is_plan_time()
        );
    }

    #[test]
    fn test_display_names_the_failing_path() {
        let err = Error::UnresolvedReference {
            path: "resource.properties.address_space".into(),
        };
        assert!(err.to_string().contains("resource.properties.address_space"));
    }
}
