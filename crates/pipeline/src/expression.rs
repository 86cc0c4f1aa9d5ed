//! Placeholder expression resolution.
//!
//! Template values may embed `{{ path }}` placeholders referencing the
//! trigger resource: identity fields (`resource.id`,
//! `resource.templateName`, `resource.templateVersion`,
//! `resource.resourceType`) or property paths
//! (`resource.properties.<name>[.<nested>…]`). Resolution is strictly
//! against the trigger - never against the target resource - and is
//! total: a path absent on the trigger fails with
//! [`Error::UnresolvedReference`] instead of substituting an empty
//! string.

use crate::error::{Error, Result};
use crate::types::ResourceInstance;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*\}\}").unwrap())
}

/// Resolve a string template against the trigger resource.
///
/// A template that is exactly one placeholder substitutes the referenced
/// value whole, preserving its structure (used for structured values
/// such as an address-space list). Anything else interpolates scalar
/// renderings into the surrounding string.
pub fn resolve(template: &str, context: &ResourceInstance) -> Result<Value> {
    let re = placeholder_re();

    let trimmed = template.trim();
    if let Some(found) = re.find(trimmed) {
        if found.start() == 0 && found.end() == trimmed.len() {
            let caps = re.captures(trimmed).unwrap();
            return lookup(&caps[1], context);
        }
    }

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in re.captures_iter(template) {
        let matched = caps.get(0).unwrap();
        out.push_str(&template[last..matched.start()]);
        out.push_str(&render_scalar(&lookup(&caps[1], context)?));
        last = matched.end();
    }
    out.push_str(&template[last..]);
    Ok(Value::String(out))
}

/// Resolve every placeholder in a structured template value.
///
/// Strings are resolved with [`resolve`]; objects and arrays are walked
/// recursively; other values pass through unchanged.
pub fn resolve_value(template: &Value, context: &ResourceInstance) -> Result<Value> {
    match template {
        Value::String(s) => resolve(s, context),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolve_value(value, context)?)))
            .collect::<Result<serde_json::Map<_, _>>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Scalar rendering for interpolation inside a larger string.
/// Structured values render as compact JSON.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Look up a placeholder path on the trigger resource.
fn lookup(path: &str, context: &ResourceInstance) -> Result<Value> {
    let unresolved = || Error::UnresolvedReference {
        path: path.to_string(),
    };

    let mut segments = path.split('.');
    if segments.next() != Some("resource") {
        return Err(unresolved());
    }

    let field = segments.next().ok_or_else(unresolved)?;
    match field {
        "id" | "templateName" | "templateVersion" | "resourceType" => {
            if segments.next().is_some() {
                return Err(unresolved());
            }
            let value = match field {
                "id" => context.id.clone(),
                "templateName" => context.template_name.clone(),
                "templateVersion" => context.template_version.clone(),
                _ => context.resource_type.as_str().to_string(),
            };
            Ok(Value::String(value))
        }
        "properties" => {
            let name = segments.next().ok_or_else(unresolved)?;
            let mut current = context.property(name).ok_or_else(unresolved)?;
            for segment in segments {
                current = current.get(segment).ok_or_else(unresolved)?;
            }
            Ok(current.clone())
        }
        _ => Err(unresolved()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;
    use serde_json::json;

    fn trigger() -> ResourceInstance {
        ResourceInstance {
            id: "ws-42".into(),
            template_name: "tre-workspace-base".into(),
            template_version: "0.5.1".into(),
            resource_type: ResourceKind::Workspace,
            properties: json!({
                "display_name": "Research WS",
                "address_space": ["10.1.0.0/24", "10.1.1.0/24"],
                "vm": { "size": "Standard_D2s", "count": 3 }
            })
            .as_object()
            .unwrap()
            .clone(),
        }
    }

    #[test]
    fn test_interpolation_inside_larger_string() {
        let resolved = resolve("nrc_workspace_{{ resource.id }}", &trigger()).unwrap();
        assert_eq!(resolved, json!("nrc_workspace_ws-42"));
    }

    #[test]
    fn test_whole_value_substitution_keeps_structure() {
        let resolved = resolve("{{ resource.properties.address_space }}", &trigger()).unwrap();
        assert_eq!(resolved, json!(["10.1.0.0/24", "10.1.1.0/24"]));
    }

    #[test]
    fn test_identity_fields() {
        let context = trigger();
        assert_eq!(
            resolve("{{ resource.templateName }}", &context).unwrap(),
            json!("tre-workspace-base")
        );
        assert_eq!(
            resolve("{{ resource.templateVersion }}", &context).unwrap(),
            json!("0.5.1")
        );
        assert_eq!(
            resolve("{{ resource.resourceType }}", &context).unwrap(),
            json!("workspace")
        );
    }

    #[test]
    fn test_nested_property_path() {
        let resolved = resolve("size={{ resource.properties.vm.size }}", &trigger()).unwrap();
        assert_eq!(resolved, json!("size=Standard_D2s"));
    }

    #[test]
    fn test_numeric_scalar_interpolation() {
        let resolved = resolve("{{ resource.properties.vm.count }} hosts", &trigger()).unwrap();
        assert_eq!(resolved, json!("3 hosts"));
    }

    #[test]
    fn test_structured_value_mid_string_renders_json() {
        let resolved = resolve("spaces: {{ resource.properties.address_space }}", &trigger());
        assert_eq!(
            resolved.unwrap(),
            json!(r#"spaces: ["10.1.0.0/24","10.1.1.0/24"]"#)
        );
    }

    #[test]
    fn test_multiple_placeholders() {
        let resolved = resolve(
            "{{ resource.templateName }}/{{ resource.id }}",
            &trigger(),
        )
        .unwrap();
        assert_eq!(resolved, json!("tre-workspace-base/ws-42"));
    }

    #[test]
    fn test_string_without_placeholders_unchanged() {
        let resolved = resolve("Allow", &trigger()).unwrap();
        assert_eq!(resolved, json!("Allow"));
    }

    #[test]
    fn test_missing_property_names_full_path() {
        let err = resolve("{{ resource.properties.missing_field }}", &trigger()).unwrap_err();
        match err {
            Error::UnresolvedReference { path } => {
                assert_eq!(path, "resource.properties.missing_field");
            }
            other => panic!("expected UnresolvedReference, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_root_is_unresolved() {
        assert!(resolve("{{ target.id }}", &trigger()).is_err());
        assert!(resolve("{{ resource.owner }}", &trigger()).is_err());
    }

    #[test]
    fn test_trailing_segment_on_identity_field_is_unresolved() {
        assert!(resolve("{{ resource.id.suffix }}", &trigger()).is_err());
    }

    #[test]
    fn test_resolve_value_walks_objects_and_arrays() {
        let template = json!({
            "name": "nrc_workspace_{{ resource.id }}",
            "action": "Allow",
            "rules": [{
                "source_addresses": "{{ resource.properties.address_space }}",
                "destination_ports": ["443"]
            }]
        });
        let resolved = resolve_value(&template, &trigger()).unwrap();
        assert_eq!(
            resolved,
            json!({
                "name": "nrc_workspace_ws-42",
                "action": "Allow",
                "rules": [{
                    "source_addresses": ["10.1.0.0/24", "10.1.1.0/24"],
                    "destination_ports": ["443"]
                }]
            })
        );
    }

    #[test]
    fn test_resolve_value_passes_non_strings_through() {
        let context = trigger();
        assert_eq!(resolve_value(&json!(443), &context).unwrap(), json!(443));
        assert_eq!(resolve_value(&json!(true), &context).unwrap(), json!(true));
        assert_eq!(resolve_value(&Value::Null, &context).unwrap(), Value::Null);
    }
}
