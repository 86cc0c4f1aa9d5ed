//! Step planning - expands a pipeline definition into an execution plan.
//!
//! Ordering is direction-aware and a hard contract: install and upgrade
//! run the self step first (dependents may reference properties that
//! only exist once the self action completed), uninstall runs dependent
//! steps first and the self step last (dependent state referencing the
//! trigger is cleaned up while the trigger still exists). The branch is
//! explicit on the lifecycle action - never inferred from the position
//! of the `main` marker in the definition list.
//!
//! Every placeholder expression is resolved at plan time, so a single
//! unresolved reference aborts planning before any side effect occurs.

use crate::error::{Error, Result};
use crate::expression;
use crate::patch::ArraySubstitution;
use crate::types::{
    LifecycleAction, PipelineDefinition, PropertyKind, PropertyPatch, ResourceInstance,
    ResourceKind, StepSpec, SELF_STEP_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The resource a planned step acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepTarget {
    /// The triggering resource itself, addressed by id
    Trigger {
        resource_id: String,
        resource_type: ResourceKind,
        template_name: String,
    },
    /// A dependent resource, addressed by template within a resource type
    Dependent {
        resource_type: ResourceKind,
        template_name: String,
    },
}

impl StepTarget {
    pub fn template_name(&self) -> &str {
        match self {
            Self::Trigger { template_name, .. } | Self::Dependent { template_name, .. } => {
                template_name
            }
        }
    }

    pub fn resource_type(&self) -> ResourceKind {
        match self {
            Self::Trigger { resource_type, .. } | Self::Dependent { resource_type, .. } => {
                *resource_type
            }
        }
    }
}

/// A fully-resolved property mutation, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPatch {
    pub property: String,
    pub operation: PatchOperation,
}

/// What to do with the property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchOperation {
    /// Overwrite the property with the resolved value
    Set { value: Value },
    /// Read-modify-write the array property under the substitution
    Array {
        substitution: ArraySubstitution,
        value: Value,
    },
}

/// One concrete step of an execution plan. No placeholders remain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Deterministic identifier derived from the trigger id, lifecycle
    /// action, plan position and definition step id. Re-planning the
    /// same lifecycle event reproduces the same identifiers.
    pub step_id: String,
    pub target: StepTarget,
    /// Action the dispatcher invokes on the target
    pub action: String,
    pub patches: Vec<ResolvedPatch>,
}

impl PlannedStep {
    pub fn is_self(&self) -> bool {
        matches!(self.target, StepTarget::Trigger { .. })
    }
}

/// The planner's output - ordered, fully-expanded, consumable and
/// loggable independently of execution for dry-run/audit purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub action: LifecycleAction,
    pub trigger_id: String,
    pub steps: Vec<PlannedStep>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.step_id.as_str()).collect()
    }
}

/// Expand a pipeline definition into an ordered execution plan for one
/// lifecycle event.
///
/// An action with no defined steps plans the implicit self step alone.
/// Planning wholly succeeds or is discarded: structural problems raise
/// [`Error::MalformedDefinition`] and unresolvable placeholders raise
/// [`Error::UnresolvedReference`] before any dispatch can happen.
pub fn plan(
    action: LifecycleAction,
    definition: &PipelineDefinition,
    trigger: &ResourceInstance,
) -> Result<ExecutionPlan> {
    let (self_spec, dependents) = split_steps(action, definition.steps_for(action))?;

    let mut steps = Vec::with_capacity(dependents.len() + 1);
    if action.is_teardown() {
        for spec in &dependents {
            steps.push(resolve_dependent(action, trigger, steps.len(), spec)?);
        }
        steps.push(resolve_self(action, trigger, steps.len(), self_spec)?);
    } else {
        steps.push(resolve_self(action, trigger, steps.len(), self_spec)?);
        for spec in &dependents {
            steps.push(resolve_dependent(action, trigger, steps.len(), spec)?);
        }
    }

    Ok(ExecutionPlan {
        action,
        trigger_id: trigger.id.clone(),
        steps,
    })
}

/// Structurally validate every action list of a definition, without
/// needing a trigger resource. Used by catalog validation tooling.
pub fn validate_definition(definition: &PipelineDefinition) -> Result<()> {
    for action in [
        LifecycleAction::Install,
        LifecycleAction::Upgrade,
        LifecycleAction::Uninstall,
    ] {
        split_steps(action, definition.steps_for(action))?;
    }
    Ok(())
}

/// Split a definition list into the self marker and dependent steps,
/// enforcing the structural rules.
fn split_steps<'a>(
    action: LifecycleAction,
    specs: &'a [StepSpec],
) -> Result<(Option<&'a StepSpec>, Vec<&'a StepSpec>)> {
    let mut self_spec = None;
    let mut dependents = Vec::new();

    for spec in specs {
        if spec.is_self() {
            if self_spec.is_some() {
                return Err(Error::malformed(format!(
                    "{action} pipeline declares the '{SELF_STEP_ID}' step more than once"
                )));
            }
            if spec.has_target_fields() {
                return Err(Error::malformed(format!(
                    "{action} pipeline: the '{SELF_STEP_ID}' step must not name a target resource"
                )));
            }
            self_spec = Some(spec);
        } else {
            if spec.resource_template_name.is_none()
                || spec.resource_type.is_none()
                || spec.resource_action.is_none()
            {
                return Err(Error::malformed(format!(
                    "{action} pipeline: step '{}' must name resourceTemplateName, resourceType and resourceAction",
                    spec.step_id
                )));
            }
            dependents.push(spec);
        }
        for patch in &spec.properties {
            substitution_for(action, spec, patch)?;
        }
    }

    if !specs.is_empty() && self_spec.is_none() {
        return Err(Error::malformed(format!(
            "{action} pipeline omits the required '{SELF_STEP_ID}' step"
        )));
    }

    Ok((self_spec, dependents))
}

/// Validated substitution for a patch; `None` for scalar patches.
fn substitution_for(
    action: LifecycleAction,
    spec: &StepSpec,
    patch: &PropertyPatch,
) -> Result<Option<ArraySubstitution>> {
    match patch.kind {
        PropertyKind::String => {
            if patch.array_substitution_action.is_some() || patch.array_match_field.is_some() {
                return Err(Error::malformed(format!(
                    "{action} pipeline: scalar property '{}' in step '{}' carries array substitution fields",
                    patch.name, spec.step_id
                )));
            }
            Ok(None)
        }
        PropertyKind::Array => {
            let substitution_action =
                patch.array_substitution_action.as_deref().ok_or_else(|| {
                    Error::malformed(format!(
                        "{action} pipeline: array property '{}' in step '{}' has no arraySubstitutionAction",
                        patch.name, spec.step_id
                    ))
                })?;
            let match_field = patch
                .array_match_field
                .as_deref()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    Error::malformed(format!(
                        "{action} pipeline: array property '{}' in step '{}' has no arrayMatchField",
                        patch.name, spec.step_id
                    ))
                })?;
            ArraySubstitution::from_document(substitution_action, match_field)
                .ok_or_else(|| {
                    Error::malformed(format!(
                        "{action} pipeline: unknown arraySubstitutionAction '{substitution_action}' on property '{}' in step '{}'",
                        patch.name, spec.step_id
                    ))
                })
                .map(Some)
        }
    }
}

fn resolve_self(
    action: LifecycleAction,
    trigger: &ResourceInstance,
    position: usize,
    spec: Option<&StepSpec>,
) -> Result<PlannedStep> {
    let patches = match spec {
        Some(spec) => resolve_patches(action, trigger, spec)?,
        None => Vec::new(),
    };

    Ok(PlannedStep {
        step_id: step_identifier(trigger, action, position, SELF_STEP_ID),
        target: StepTarget::Trigger {
            resource_id: trigger.id.clone(),
            resource_type: trigger.resource_type,
            template_name: trigger.template_name.clone(),
        },
        action: action.as_str().to_string(),
        patches,
    })
}

fn resolve_dependent(
    action: LifecycleAction,
    trigger: &ResourceInstance,
    position: usize,
    spec: &StepSpec,
) -> Result<PlannedStep> {
    // split_steps guarantees the target fields are present
    let template_name = spec.resource_template_name.clone().unwrap();
    let resource_type = spec.resource_type.unwrap();
    let resource_action = spec.resource_action.clone().unwrap();

    Ok(PlannedStep {
        step_id: step_identifier(trigger, action, position, &spec.step_id),
        target: StepTarget::Dependent {
            resource_type,
            template_name,
        },
        action: resource_action,
        patches: resolve_patches(action, trigger, spec)?,
    })
}

fn resolve_patches(
    action: LifecycleAction,
    trigger: &ResourceInstance,
    spec: &StepSpec,
) -> Result<Vec<ResolvedPatch>> {
    spec.properties
        .iter()
        .map(|patch| {
            let value = expression::resolve_value(&patch.value, trigger)?;
            let operation = match substitution_for(action, spec, patch)? {
                Some(substitution) => PatchOperation::Array {
                    substitution,
                    value,
                },
                None => PatchOperation::Set { value },
            };
            Ok(ResolvedPatch {
                property: patch.name.clone(),
                operation,
            })
        })
        .collect()
}

fn step_identifier(
    trigger: &ResourceInstance,
    action: LifecycleAction,
    position: usize,
    spec_step_id: &str,
) -> String {
    format!("{}:{}:{:02}:{}", trigger.id, action, position, spec_step_id)
}
