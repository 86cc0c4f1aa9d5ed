//! Resource state snapshot
//!
//! A JSON file of deployed resources standing in for the provisioning
//! backend's store. [`SnapshotDispatcher`] implements the engine's
//! dispatcher capability against it: property fetches read the stored
//! arrays, invocations apply property writes and create or remove
//! resources for self steps. The dispatcher is single-process, so the
//! read-modify-write atomicity the engine requires holds trivially.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use pipeline::{
    InvokeOutcome, PropertyWrite, ResourceActionDispatcher, ResourceInstance, StepTarget,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// A deployed resource plus its bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    #[serde(flatten)]
    pub resource: ResourceInstance,
    /// Epoch seconds of the last mutation
    #[serde(default)]
    pub updated_when: f64,
}

/// The full snapshot file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub resources: Vec<StoredResource>,
}

impl StateSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid state snapshot: {}", path.display()))
    }

    /// Load the snapshot, or start empty when the file does not exist yet
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Find the resource a step target addresses
    pub fn find(&self, target: &StepTarget) -> Option<&StoredResource> {
        self.resources.iter().find(|stored| matches(stored, target))
    }

    fn position(&self, target: &StepTarget) -> Option<usize> {
        self.resources
            .iter()
            .position(|stored| matches(stored, target))
    }
}

fn matches(stored: &StoredResource, target: &StepTarget) -> bool {
    match target {
        StepTarget::Trigger { resource_id, .. } => stored.resource.id == *resource_id,
        StepTarget::Dependent {
            resource_type,
            template_name,
        } => {
            stored.resource.resource_type == *resource_type
                && stored.resource.template_name == *template_name
        }
    }
}

fn now_epoch() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Engine dispatcher backed by an in-memory snapshot
pub struct SnapshotDispatcher {
    snapshot: Mutex<StateSnapshot>,
}

impl SnapshotDispatcher {
    pub fn new(snapshot: StateSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Hand the (possibly mutated) snapshot back for persisting
    pub fn into_snapshot(self) -> StateSnapshot {
        self.snapshot.into_inner().unwrap()
    }
}

impl ResourceActionDispatcher for SnapshotDispatcher {
    fn fetch_property(&self, target: &StepTarget, property: &str) -> Result<Vec<Value>> {
        let snapshot = self.snapshot.lock().unwrap();
        match snapshot.find(target).and_then(|s| s.resource.property(property)) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => bail!(
                "property '{}' on '{}' is not an array",
                property,
                target.template_name()
            ),
        }
    }

    fn invoke(
        &self,
        target: &StepTarget,
        action: &str,
        writes: &[PropertyWrite],
    ) -> Result<InvokeOutcome> {
        let mut snapshot = self.snapshot.lock().unwrap();
        let position = snapshot.position(target);

        match target {
            StepTarget::Trigger {
                resource_id,
                resource_type,
                template_name,
            } => {
                match position {
                    Some(index) => {
                        if action == "uninstall" {
                            snapshot.resources.remove(index);
                        } else {
                            apply_writes(&mut snapshot.resources[index], writes);
                        }
                    }
                    // uninstalling an absent resource is an idempotent no-op
                    None if action == "uninstall" => {}
                    None => {
                        let mut stored = StoredResource {
                            resource: ResourceInstance {
                                id: resource_id.clone(),
                                template_name: template_name.clone(),
                                template_version: String::new(),
                                resource_type: *resource_type,
                                properties: serde_json::Map::new(),
                            },
                            updated_when: 0.0,
                        };
                        apply_writes(&mut stored, writes);
                        snapshot.resources.push(stored);
                    }
                }
                Ok(InvokeOutcome::Succeeded)
            }
            StepTarget::Dependent { template_name, .. } => match position {
                Some(index) => {
                    apply_writes(&mut snapshot.resources[index], writes);
                    Ok(InvokeOutcome::Succeeded)
                }
                None => Ok(InvokeOutcome::Rejected {
                    reason: format!("no deployed resource for template '{template_name}'"),
                }),
            },
        }
    }
}

fn apply_writes(stored: &mut StoredResource, writes: &[PropertyWrite]) {
    for write in writes {
        stored
            .resource
            .properties
            .insert(write.name.clone(), write.value.clone());
    }
    stored.updated_when = now_epoch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::ResourceKind;
    use serde_json::json;

    fn firewall() -> StoredResource {
        StoredResource {
            resource: ResourceInstance {
                id: "fw-1".into(),
                template_name: "tre-shared-service-firewall".into(),
                template_version: "1.2.0".into(),
                resource_type: ResourceKind::SharedService,
                properties: json!({
                    "rule_collections": [{ "name": "nrc_workspace_A" }]
                })
                .as_object()
                .unwrap()
                .clone(),
            },
            updated_when: 0.0,
        }
    }

    fn firewall_target() -> StepTarget {
        StepTarget::Dependent {
            resource_type: ResourceKind::SharedService,
            template_name: "tre-shared-service-firewall".into(),
        }
    }

    #[test]
    fn test_snapshot_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("resources.json");

        let snapshot = StateSnapshot {
            resources: vec![firewall()],
        };
        snapshot.save(&path).unwrap();

        let loaded = StateSnapshot::load(&path).unwrap();
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.resources[0].resource.id, "fw-1");
        assert_eq!(
            loaded.resources[0].resource.resource_type,
            ResourceKind::SharedService
        );
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = StateSnapshot::load_or_default(&dir.path().join("missing.json")).unwrap();
        assert!(snapshot.resources.is_empty());
    }

    #[test]
    fn test_fetch_property_reads_stored_array() {
        let dispatcher = SnapshotDispatcher::new(StateSnapshot {
            resources: vec![firewall()],
        });
        let rules = dispatcher
            .fetch_property(&firewall_target(), "rule_collections")
            .unwrap();
        assert_eq!(rules, vec![json!({ "name": "nrc_workspace_A" })]);
    }

    #[test]
    fn test_fetch_unset_property_reads_empty() {
        let dispatcher = SnapshotDispatcher::new(StateSnapshot {
            resources: vec![firewall()],
        });
        assert!(dispatcher
            .fetch_property(&firewall_target(), "dns_zones")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invoke_on_dependent_applies_writes() {
        let dispatcher = SnapshotDispatcher::new(StateSnapshot {
            resources: vec![firewall()],
        });
        let writes = vec![PropertyWrite::new(
            "rule_collections",
            json!([{ "name": "nrc_workspace_A" }, { "name": "nrc_workspace_B" }]),
        )];
        let outcome = dispatcher
            .invoke(&firewall_target(), "upgrade", &writes)
            .unwrap();
        assert_eq!(outcome, InvokeOutcome::Succeeded);

        let snapshot = dispatcher.into_snapshot();
        let stored = &snapshot.resources[0];
        assert_eq!(
            stored.resource.property("rule_collections").unwrap()[1]["name"],
            "nrc_workspace_B"
        );
        assert!(stored.updated_when > 0.0);
    }

    #[test]
    fn test_invoke_on_missing_dependent_is_rejected() {
        let dispatcher = SnapshotDispatcher::new(StateSnapshot::default());
        let outcome = dispatcher
            .invoke(&firewall_target(), "upgrade", &[])
            .unwrap();
        assert!(matches!(outcome, InvokeOutcome::Rejected { .. }));
    }

    #[test]
    fn test_install_self_step_creates_the_resource() {
        let dispatcher = SnapshotDispatcher::new(StateSnapshot::default());
        let target = StepTarget::Trigger {
            resource_id: "ws-b".into(),
            resource_type: ResourceKind::Workspace,
            template_name: "tre-workspace-base".into(),
        };
        dispatcher.invoke(&target, "install", &[]).unwrap();

        let snapshot = dispatcher.into_snapshot();
        assert_eq!(snapshot.resources.len(), 1);
        assert_eq!(snapshot.resources[0].resource.id, "ws-b");
    }

    #[test]
    fn test_uninstall_self_step_removes_the_resource() {
        let target = StepTarget::Trigger {
            resource_id: "fw-1".into(),
            resource_type: ResourceKind::SharedService,
            template_name: "tre-shared-service-firewall".into(),
        };
        let dispatcher = SnapshotDispatcher::new(StateSnapshot {
            resources: vec![firewall()],
        });
        dispatcher.invoke(&target, "uninstall", &[]).unwrap();
        assert!(dispatcher.into_snapshot().resources.is_empty());

        // absent resource: idempotent no-op
        let dispatcher = SnapshotDispatcher::new(StateSnapshot::default());
        let outcome = dispatcher.invoke(&target, "uninstall", &[]).unwrap();
        assert_eq!(outcome, InvokeOutcome::Succeeded);
    }
}
