//! Template catalog documents
//!
//! A template document describes a deployable resource (workspace,
//! workspace service, shared service) and may embed a `pipeline` block
//! with the extra orchestration steps the engine resolves. Everything
//! else in the document (parameter schema, display metadata) is carried
//! opaquely - the CLI never interprets it.

use anyhow::{Context, Result};
use pipeline::{PipelineDefinition, ResourceInstance, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// One entry of the template catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub name: String,
    pub version: String,
    pub resource_type: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineDefinition>,
    /// Catalog payload the engine does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateDocument {
    /// Load a template document from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid template document: {}", path.display()))
    }

    /// The embedded pipeline block, or the empty definition (implicit
    /// self-only pipelines) when the document has none.
    pub fn pipeline_or_default(&self) -> PipelineDefinition {
        self.pipeline.clone().unwrap_or_default()
    }
}

/// Load a trigger resource snapshot from a JSON file
pub fn load_trigger(path: &Path) -> Result<ResourceInstance> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid resource snapshot: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_with_pipeline_block() {
        let doc: TemplateDocument = serde_json::from_str(
            r#"{
                "name": "tre-workspace-base",
                "version": "0.5.1",
                "resourceType": "workspace",
                "description": "Base workspace",
                "parameters": [{ "name": "address_space", "required": true }],
                "pipeline": {
                    "install": [
                        { "stepId": "main" },
                        {
                            "stepId": "add-network-rule",
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
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.name, "tre-workspace-base");
        assert_eq!(doc.resource_type, ResourceKind::Workspace);
        assert_eq!(doc.pipeline_or_default().install.len(), 2);
        // unknown fields survive the round trip
        assert!(doc.extra.contains_key("parameters"));
    }

    #[test]
    fn test_template_without_pipeline_defaults_to_empty() {
        let doc: TemplateDocument = serde_json::from_str(
            r#"{ "name": "tre-shared-service-firewall", "version": "1.2.0", "resourceType": "shared-service" }"#,
        )
        .unwrap();
        assert!(doc.pipeline.is_none());
        assert!(doc.pipeline_or_default().is_empty());
    }

    #[test]
    fn test_load_reports_the_failing_path() {
        let err = TemplateDocument::load(Path::new("/nonexistent/template.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/template.json"));
    }

    #[test]
    fn test_shipped_catalog_documents_are_well_formed() {
        let catalog = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
        for entry in fs::read_dir(catalog).unwrap() {
            let path = entry.unwrap().path();
            let doc = TemplateDocument::load(&path).unwrap();
            pipeline::validate_definition(&doc.pipeline_or_default()).unwrap();
        }
    }
}
