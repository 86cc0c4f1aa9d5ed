//! Core types for pipeline definitions and resource instances

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Reserved step id marking "act on the triggering resource itself".
///
/// A step carrying this id never names a target template; the planner
/// dispatches it against the trigger resource.
pub const SELF_STEP_ID: &str = "main";

/// Lifecycle action that triggers a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Install,
    Upgrade,
    Uninstall,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
            Self::Uninstall => "uninstall",
        }
    }

    /// Teardown runs dependent steps before the self step, so dependent
    /// state is cleaned up while the trigger resource still exists.
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::Uninstall)
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Self::Install),
            "upgrade" => Ok(Self::Upgrade),
            "uninstall" => Ok(Self::Uninstall),
            other => Err(format!("unknown lifecycle action: '{other}'")),
        }
    }
}

/// Category of deployable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "workspace")]
    Workspace,
    #[serde(rename = "workspace-service")]
    WorkspaceService,
    #[serde(rename = "user-resource")]
    UserResource,
    #[serde(rename = "shared-service")]
    SharedService,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::WorkspaceService => "workspace-service",
            Self::UserResource => "user-resource",
            Self::SharedService => "shared-service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployed resource as seen by the engine.
///
/// The engine reads the trigger resource's identity and properties for
/// expression resolution, and requests mutations on dependent resources
/// through the dispatcher. It never owns resource state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInstance {
    /// Opaque identifier assigned by the provisioning backend
    pub id: String,
    /// Template the resource was deployed from
    pub template_name: String,
    #[serde(default)]
    pub template_version: String,
    pub resource_type: ResourceKind,
    /// Structured properties: scalars, objects, or ordered lists of objects
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ResourceInstance {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Extra orchestration steps to run per lifecycle action.
///
/// Embedded in template documents as the `pipeline` block. Each action
/// carries an ordered list of steps; actions without steps fall back to
/// the implicit self-only plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install: Vec<StepSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upgrade: Vec<StepSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uninstall: Vec<StepSpec>,
}

impl PipelineDefinition {
    pub fn steps_for(&self, action: LifecycleAction) -> &[StepSpec] {
        match action {
            LifecycleAction::Install => &self.install,
            LifecycleAction::Upgrade => &self.upgrade,
            LifecycleAction::Uninstall => &self.uninstall,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.upgrade.is_empty() && self.uninstall.is_empty()
    }
}

/// One step in a pipeline definition.
///
/// The reserved [`SELF_STEP_ID`] marks the step acting on the trigger
/// itself; every other step names a dependent resource by template and
/// the action to invoke on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyPatch>,
}

impl StepSpec {
    pub fn is_self(&self) -> bool {
        self.step_id == SELF_STEP_ID
    }

    /// Whether the step names any part of a dependent target.
    pub fn has_target_fields(&self) -> bool {
        self.resource_template_name.is_some()
            || self.resource_type.is_some()
            || self.resource_action.is_some()
    }
}

/// Declared type of a patched property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Scalar or whole-value assignment
    #[default]
    String,
    /// Ordered list of objects patched by match field
    Array,
}

/// A property mutation declared by a pipeline step.
///
/// The `value` is a template: strings may embed `{{ … }}` placeholder
/// expressions resolved against the trigger resource at plan time. For
/// `remove` substitutions the value carries only the fields needed to
/// compute the match key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPatch {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: PropertyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_substitution_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_match_field: Option<String>,
    pub value: Value,
}

/// Status of a finished pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Outcome of driving an execution plan.
///
/// A failed run reports the steps already applied; prior steps are never
/// rolled back. Operators retry by re-running the same lifecycle action,
/// which is safe because planning and patching are idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: RunStatus,
    pub completed_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl PipelineResult {
    pub fn completed(completed_steps: Vec<String>) -> Self {
        Self {
            status: RunStatus::Completed,
            completed_steps,
            failed_step: None,
            failed_step_index: None,
            cause: None,
        }
    }

    pub fn failed(
        completed_steps: Vec<String>,
        index: usize,
        step_id: impl Into<String>,
        cause: impl fmt::Display,
    ) -> Self {
        Self {
            status: RunStatus::Failed,
            completed_steps,
            failed_step: Some(step_id.into()),
            failed_step_index: Some(index),
            cause: Some(cause.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_action_direction() {
        assert!(!LifecycleAction::Install.is_teardown());
        assert!(!LifecycleAction::Upgrade.is_teardown());
        assert!(LifecycleAction::Uninstall.is_teardown());
    }

    #[test]
    fn test_lifecycle_action_round_trip() {
        for action in [
            LifecycleAction::Install,
            LifecycleAction::Upgrade,
            LifecycleAction::Uninstall,
        ] {
            assert_eq!(action.as_str().parse::<LifecycleAction>(), Ok(action));
        }
        assert!("delete".parse::<LifecycleAction>().is_err());
    }

    #[test]
    fn test_resource_kind_wire_names() {
        let kind: ResourceKind = serde_json::from_value(json!("shared-service")).unwrap();
        assert_eq!(kind, ResourceKind::SharedService);
        assert_eq!(
            serde_json::to_value(ResourceKind::WorkspaceService).unwrap(),
            json!("workspace-service")
        );
    }

    #[test]
    fn test_step_spec_self_marker() {
        let step: StepSpec = serde_json::from_value(json!({ "stepId": "main" })).unwrap();
        assert!(step.is_self());
        assert!(!step.has_target_fields());
        assert!(step.properties.is_empty());
    }

    #[test]
    fn test_pipeline_definition_deserializes_camel_case() {
        let definition: PipelineDefinition = serde_json::from_value(json!({
            "install": [
                { "stepId": "main" },
                {
                    "stepId": "add-rule",
                    "resourceTemplateName": "tre-shared-service-firewall",
                    "resourceType": "shared-service",
                    "resourceAction": "upgrade",
                    "properties": [{
                        "name": "rule_collections",
                        "type": "array",
                        "arraySubstitutionAction": "replace",
                        "arrayMatchField": "name",
                        "value": { "name": "nrc_{{ resource.id }}" }
                    }]
                }
            ]
        }))
        .unwrap();

        assert_eq!(definition.install.len(), 2);
        assert!(definition.upgrade.is_empty());
        let dependent = &definition.install[1];
        assert_eq!(dependent.resource_type, Some(ResourceKind::SharedService));
        assert_eq!(dependent.properties[0].kind, PropertyKind::Array);
        assert_eq!(
            dependent.properties[0].array_match_field.as_deref(),
            Some("name")
        );
    }

    #[test]
    fn test_pipeline_result_constructors() {
        let ok = PipelineResult::completed(vec!["a".into(), "b".into()]);
        assert!(ok.is_success());
        assert!(ok.failed_step.is_none());

        let failed = PipelineResult::failed(vec!["a".into()], 1, "b", "backend unreachable");
        assert!(!failed.is_success());
        assert_eq!(failed.failed_step_index, Some(1));
        assert_eq!(failed.cause.as_deref(), Some("backend unreachable"));
    }
}
