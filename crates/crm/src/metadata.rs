//! Tooling API payload builders for custom objects, fields, tabs and apps.

use serde_json::{json, Map, Value};
use sfmcp_core::OperationError;

pub const CUSTOM_OBJECT_SUFFIX: &str = "__c";
pub const CUSTOM_METADATA_SUFFIX: &str = "__mdt";

/// Derive an API name from a label: `Sales Region` -> `Sales_Region__c`. An empty
/// suffix yields a plain developer name for apps and folders.
pub fn api_name(label: &str, suffix: &str) -> String {
    let trimmed = label.trim();
    if !suffix.is_empty() && trimmed.ends_with(suffix) {
        return trimmed.to_string();
    }

    let mut base = String::with_capacity(trimmed.len() + suffix.len());
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() {
            base.push(ch);
        } else if !base.ends_with('_') {
            base.push('_');
        }
    }
    let mut base = base.trim_matches('_').to_string();
    if base.is_empty() {
        base.push('X');
    } else if base.starts_with(|ch: char| ch.is_ascii_digit()) {
        base.insert(0, 'X');
    }

    format!("{base}{suffix}")
}

/// `Amount__c` -> `Amount`; names without a custom suffix are returned as-is.
pub fn developer_name(api_name: &str) -> &str {
    api_name
        .strip_suffix(CUSTOM_OBJECT_SUFFIX)
        .or_else(|| api_name.strip_suffix(CUSTOM_METADATA_SUFFIX))
        .unwrap_or(api_name)
}

pub fn custom_object_metadata(label: &str, plural_label: &str, description: Option<&str>) -> Value {
    let mut metadata = json!({
        "label": label,
        "pluralLabel": plural_label,
        "nameField": { "label": format!("{label} Name"), "type": "Text" },
        "deploymentStatus": "Deployed",
        "sharingModel": "ReadWrite",
    });
    if let Some(description) = description {
        metadata["description"] = Value::String(description.to_string());
    }
    metadata
}

pub fn custom_metadata_type_metadata(
    label: &str,
    plural_label: &str,
    description: Option<&str>,
) -> Value {
    let mut metadata = json!({
        "label": label,
        "pluralLabel": plural_label,
        "visibility": "Public",
    });
    if let Some(description) = description {
        metadata["description"] = Value::String(description.to_string());
    }
    metadata
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDefinition {
    pub api_name: String,
    pub metadata: Value,
}

/// Build a `CustomField` definition from one entry of a `fields` argument.
pub fn field_definition(entry: &Map<String, Value>) -> Result<FieldDefinition, OperationError> {
    let label = entry
        .get("label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .ok_or_else(|| OperationError::invalid("every field needs a `label`"))?;
    let field_type = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| OperationError::invalid(format!("field `{label}` needs a `type`")))?;
    let api_name = entry
        .get("api_name")
        .and_then(Value::as_str)
        .map(|name| api_name(name, CUSTOM_OBJECT_SUFFIX))
        .unwrap_or_else(|| api_name(label, CUSTOM_OBJECT_SUFFIX));

    let int = |key: &str, default: u64| entry.get(key).and_then(Value::as_u64).unwrap_or(default);
    let normalized = field_type.trim().to_ascii_lowercase().replace([' ', '_', '-'], "");

    let mut metadata = match normalized.as_str() {
        "text" | "string" => json!({ "type": "Text", "length": int("length", 255) }),
        "number" | "integer" | "double" => json!({
            "type": "Number",
            "precision": int("precision", 18),
            "scale": int("scale", 0),
        }),
        "currency" => json!({
            "type": "Currency",
            "precision": int("precision", 18),
            "scale": int("scale", 2),
        }),
        "percent" => json!({
            "type": "Percent",
            "precision": int("precision", 5),
            "scale": int("scale", 2),
        }),
        "checkbox" | "boolean" => json!({ "type": "Checkbox", "defaultValue": "false" }),
        "date" => json!({ "type": "Date" }),
        "datetime" => json!({ "type": "DateTime" }),
        "email" => json!({ "type": "Email" }),
        "phone" => json!({ "type": "Phone" }),
        "url" => json!({ "type": "Url" }),
        "textarea" => json!({ "type": "TextArea" }),
        "longtextarea" => json!({
            "type": "LongTextArea",
            "length": int("length", 32768),
            "visibleLines": int("visible_lines", 3),
        }),
        "picklist" => {
            let values = entry
                .get("picklist_values")
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(Value::as_str).collect::<Vec<_>>())
                .unwrap_or_default();
            if values.is_empty() {
                return Err(OperationError::invalid(format!(
                    "picklist field `{label}` needs `picklist_values`"
                )));
            }
            let entries = values
                .iter()
                .map(|value| json!({ "fullName": value, "label": value, "default": false }))
                .collect::<Vec<_>>();
            json!({
                "type": "Picklist",
                "valueSet": { "valueSetDefinition": { "sorted": false, "value": entries } },
            })
        }
        "lookup" => {
            let target = entry
                .get("reference_to")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    OperationError::invalid(format!("lookup field `{label}` needs `reference_to`"))
                })?;
            json!({
                "type": "Lookup",
                "referenceTo": target,
                "relationshipName": developer_name(&api_name),
                "deleteConstraint": "SetNull",
            })
        }
        other => {
            return Err(OperationError::invalid(format!(
                "unsupported field type `{other}` for field `{label}`"
            )))
        }
    };

    metadata["label"] = Value::String(label.to_string());
    if let Some(description) = entry.get("description").and_then(Value::as_str) {
        metadata["description"] = Value::String(description.to_string());
    }
    let required = entry.get("required").and_then(Value::as_bool).unwrap_or(false);
    if required && metadata["type"] != "Checkbox" {
        metadata["required"] = Value::Bool(true);
    }

    Ok(FieldDefinition { api_name, metadata })
}

pub fn tab_metadata(motif: Option<&str>, description: Option<&str>) -> Value {
    let mut metadata = json!({
        "customObject": true,
        "motif": motif.unwrap_or("Custom20: Airplane"),
    });
    if let Some(description) = description {
        metadata["description"] = Value::String(description.to_string());
    }
    metadata
}

pub fn app_metadata(label: &str, description: Option<&str>, tabs: &[String]) -> Value {
    let mut metadata = json!({
        "label": label,
        "navType": "Standard",
        "uiType": "Lightning",
        "formFactors": ["Large"],
        "tabs": tabs,
    });
    if let Some(description) = description {
        metadata["description"] = Value::String(description.to_string());
    }
    metadata
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        api_name, app_metadata, developer_name, field_definition, CUSTOM_METADATA_SUFFIX,
        CUSTOM_OBJECT_SUFFIX,
    };

    fn entry(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn api_names_are_derived_from_labels() {
        assert_eq!(api_name("Sales Region", CUSTOM_OBJECT_SUFFIX), "Sales_Region__c");
        assert_eq!(api_name("  Invoice -- Line ", CUSTOM_OBJECT_SUFFIX), "Invoice_Line__c");
        assert_eq!(api_name("2024 Targets", CUSTOM_OBJECT_SUFFIX), "X2024_Targets__c");
        assert_eq!(api_name("Invoice__c", CUSTOM_OBJECT_SUFFIX), "Invoice__c");
        assert_eq!(api_name("Routing Rule", CUSTOM_METADATA_SUFFIX), "Routing_Rule__mdt");
        assert_eq!(api_name("Q3 Pipeline Reports", ""), "Q3_Pipeline_Reports");
        assert_eq!(developer_name("Amount__c"), "Amount");
        assert_eq!(developer_name("Account"), "Account");
    }

    #[test]
    fn text_field_defaults_length() {
        let field = field_definition(&entry(json!({"label": "Region Code", "type": "text"})))
            .expect("valid field");
        assert_eq!(field.api_name, "Region_Code__c");
        assert_eq!(field.metadata["type"], "Text");
        assert_eq!(field.metadata["length"], 255);
        assert_eq!(field.metadata["label"], "Region Code");
    }

    #[test]
    fn picklist_requires_values() {
        let missing = field_definition(&entry(json!({"label": "Stage", "type": "Picklist"})));
        assert!(missing.is_err());

        let field = field_definition(&entry(json!({
            "label": "Stage",
            "type": "Picklist",
            "picklist_values": ["New", "Won"]
        })))
        .expect("valid picklist");
        let values = &field.metadata["valueSet"]["valueSetDefinition"]["value"];
        assert_eq!(values[1]["fullName"], "Won");
    }

    #[test]
    fn lookup_uses_reference_and_relationship_name() {
        let field = field_definition(&entry(json!({
            "label": "Billing Account",
            "type": "lookup",
            "reference_to": "Account",
            "required": true
        })))
        .expect("valid lookup");
        assert_eq!(field.metadata["referenceTo"], "Account");
        assert_eq!(field.metadata["relationshipName"], "Billing_Account");
        assert_eq!(field.metadata["required"], true);
    }

    #[test]
    fn checkbox_is_never_required_and_unknown_types_fail() {
        let checkbox = field_definition(&entry(json!({
            "label": "Active",
            "type": "Checkbox",
            "required": true
        })))
        .expect("valid checkbox");
        assert!(checkbox.metadata.get("required").is_none());

        let error = field_definition(&entry(json!({"label": "Blob", "type": "hologram"})))
            .expect_err("unsupported type");
        assert!(error.to_string().contains("hologram"));
    }

    #[test]
    fn app_metadata_lists_tabs() {
        let metadata = app_metadata("Billing", None, &["Invoice__c".to_string()]);
        assert_eq!(metadata["tabs"][0], "Invoice__c");
        assert_eq!(metadata["uiType"], "Lightning");
    }
}
