//! Static catalog of invocable operations.
//!
//! The catalog and the routing table are both derived from [`OperationName`], so every
//! advertised operation has exactly one route and every route is advertised.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::errors::DispatchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationName {
    CreateObject,
    CreateObjectWithFields,
    CreateCustomField,
    DeleteObjectFields,
    CreateCustomMetadataType,
    CreateCustomMetadataField,
    CreateTab,
    CreateCustomApp,
    CreateReportFolder,
    CreateDashboardFolder,
    RunSoqlQuery,
    RunSoslSearch,
    GetObjectFields,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    DescribeObject,
}

/// Backend capability an operation name routes to. Several names may share one handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handler {
    CreateObject,
    CreateObjectWithFields,
    DeleteObjectFields,
    CreateCustomMetadataType,
    CreateTab,
    CreateCustomApp,
    CreateReportFolder,
    CreateDashboardFolder,
    RunSoqlQuery,
    RunSoslSearch,
    GetObjectFields,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    DescribeObject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationCategory {
    Metadata,
    Data,
}

impl OperationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Data => "data",
        }
    }
}

impl OperationName {
    /// Catalog order.
    pub const ALL: [OperationName; 17] = [
        Self::CreateObject,
        Self::CreateObjectWithFields,
        Self::CreateCustomField,
        Self::DeleteObjectFields,
        Self::CreateCustomMetadataType,
        Self::CreateCustomMetadataField,
        Self::CreateTab,
        Self::CreateCustomApp,
        Self::CreateReportFolder,
        Self::CreateDashboardFolder,
        Self::RunSoqlQuery,
        Self::RunSoslSearch,
        Self::GetObjectFields,
        Self::CreateRecord,
        Self::UpdateRecord,
        Self::DeleteRecord,
        Self::DescribeObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateObject => "create_object",
            Self::CreateObjectWithFields => "create_object_with_fields",
            Self::CreateCustomField => "create_custom_field",
            Self::DeleteObjectFields => "delete_object_fields",
            Self::CreateCustomMetadataType => "create_custom_metadata_type",
            Self::CreateCustomMetadataField => "create_custom_metadata_field",
            Self::CreateTab => "create_tab",
            Self::CreateCustomApp => "create_custom_app",
            Self::CreateReportFolder => "create_report_folder",
            Self::CreateDashboardFolder => "create_dashboard_folder",
            Self::RunSoqlQuery => "run_soql_query",
            Self::RunSoslSearch => "run_sosl_search",
            Self::GetObjectFields => "get_object_fields",
            Self::CreateRecord => "create_record",
            Self::UpdateRecord => "update_record",
            Self::DeleteRecord => "delete_record",
            Self::DescribeObject => "describe_object",
        }
    }

    /// The routing table.
    pub fn handler(&self) -> Handler {
        match self {
            Self::CreateObject => Handler::CreateObject,
            Self::CreateObjectWithFields | Self::CreateCustomField => {
                Handler::CreateObjectWithFields
            }
            Self::DeleteObjectFields => Handler::DeleteObjectFields,
            Self::CreateCustomMetadataType | Self::CreateCustomMetadataField => {
                Handler::CreateCustomMetadataType
            }
            Self::CreateTab => Handler::CreateTab,
            Self::CreateCustomApp => Handler::CreateCustomApp,
            Self::CreateReportFolder => Handler::CreateReportFolder,
            Self::CreateDashboardFolder => Handler::CreateDashboardFolder,
            Self::RunSoqlQuery => Handler::RunSoqlQuery,
            Self::RunSoslSearch => Handler::RunSoslSearch,
            Self::GetObjectFields => Handler::GetObjectFields,
            Self::CreateRecord => Handler::CreateRecord,
            Self::UpdateRecord => Handler::UpdateRecord,
            Self::DeleteRecord => Handler::DeleteRecord,
            Self::DescribeObject => Handler::DescribeObject,
        }
    }

    pub fn category(&self) -> OperationCategory {
        match self {
            Self::RunSoqlQuery
            | Self::RunSoslSearch
            | Self::GetObjectFields
            | Self::CreateRecord
            | Self::UpdateRecord
            | Self::DeleteRecord
            | Self::DescribeObject => OperationCategory::Data,
            _ => OperationCategory::Metadata,
        }
    }

    pub fn descriptor(&self) -> OperationDescriptor {
        let (description, properties, required): (&str, Value, &[&str]) = match self {
            Self::CreateObject => (
                "Create a new custom object in Salesforce.",
                json!({
                    "name": string_prop("Singular label of the object, e.g. Invoice"),
                    "plural_name": string_prop("Plural label of the object, e.g. Invoices"),
                    "api_name": string_prop("Optional API name; derived from name when omitted (suffix __c added)"),
                    "description": string_prop("Optional description of the object"),
                }),
                &["name", "plural_name"],
            ),
            Self::CreateObjectWithFields => (
                "Create a new custom object together with its custom fields.",
                json!({
                    "name": string_prop("Singular label of the object"),
                    "plural_name": string_prop("Plural label of the object"),
                    "api_name": string_prop("Optional API name of the object"),
                    "description": string_prop("Optional description of the object"),
                    "fields": fields_prop(),
                }),
                &["name", "plural_name", "fields"],
            ),
            Self::CreateCustomField => (
                "Add one or more custom fields to an existing Salesforce object.",
                json!({
                    "object_name": string_prop("API name of the object, e.g. Account or Invoice__c"),
                    "fields": fields_prop(),
                }),
                &["object_name", "fields"],
            ),
            Self::DeleteObjectFields => (
                "Delete custom fields from a Salesforce object.",
                json!({
                    "object_name": string_prop("API name of the object"),
                    "field_names": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "API names of the custom fields to delete, e.g. Amount__c"
                    },
                }),
                &["object_name", "field_names"],
            ),
            Self::CreateCustomMetadataType => (
                "Create a custom metadata type, optionally with fields.",
                json!({
                    "name": string_prop("Singular label of the metadata type"),
                    "plural_name": string_prop("Plural label of the metadata type"),
                    "api_name": string_prop("Optional API name; suffix __mdt added when omitted"),
                    "description": string_prop("Optional description"),
                    "fields": fields_prop(),
                }),
                &["name", "plural_name"],
            ),
            Self::CreateCustomMetadataField => (
                "Add fields to an existing custom metadata type.",
                json!({
                    "api_name": string_prop("API name of the metadata type, e.g. Routing_Rule__mdt"),
                    "fields": fields_prop(),
                }),
                &["api_name", "fields"],
            ),
            Self::CreateTab => (
                "Create a custom tab for a custom object.",
                json!({
                    "object_name": string_prop("API name of the custom object, e.g. Invoice__c"),
                    "motif": string_prop("Optional tab style, e.g. 'Custom20: Airplane'"),
                    "description": string_prop("Optional description of the tab"),
                }),
                &["object_name"],
            ),
            Self::CreateCustomApp => (
                "Create a custom Lightning app containing the given tabs.",
                json!({
                    "label": string_prop("Label of the app"),
                    "api_name": string_prop("Optional API name of the app"),
                    "description": string_prop("Optional description of the app"),
                    "tabs": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tab names to include, e.g. standard-Account or Invoice__c"
                    },
                }),
                &["label"],
            ),
            Self::CreateReportFolder => (
                "Create a report folder.",
                json!({
                    "folder_name": string_prop("Label of the folder"),
                    "access_type": string_prop("Optional access type: Public, Hidden or Shared"),
                }),
                &["folder_name"],
            ),
            Self::CreateDashboardFolder => (
                "Create a dashboard folder.",
                json!({
                    "folder_name": string_prop("Label of the folder"),
                    "access_type": string_prop("Optional access type: Public, Hidden or Shared"),
                }),
                &["folder_name"],
            ),
            Self::RunSoqlQuery => (
                "Run a SOQL query against the connected org and return the matching records.",
                json!({ "query": string_prop("SOQL query, e.g. SELECT Id, Name FROM Account LIMIT 5") }),
                &["query"],
            ),
            Self::RunSoslSearch => (
                "Run a SOSL search across objects.",
                json!({ "search": string_prop("SOSL search, e.g. FIND {Acme} IN ALL FIELDS RETURNING Account(Name)") }),
                &["search"],
            ),
            Self::GetObjectFields => (
                "List the fields of a Salesforce object with their labels and types.",
                json!({ "object_name": string_prop("API name of the object, e.g. Account") }),
                &["object_name"],
            ),
            Self::CreateRecord => (
                "Create a record of the given object.",
                json!({
                    "object_name": string_prop("API name of the object"),
                    "data": { "type": "object", "description": "Field values keyed by field API name" },
                }),
                &["object_name", "data"],
            ),
            Self::UpdateRecord => (
                "Update fields on an existing record.",
                json!({
                    "object_name": string_prop("API name of the object"),
                    "record_id": string_prop("Salesforce record Id"),
                    "data": { "type": "object", "description": "Field values keyed by field API name" },
                }),
                &["object_name", "record_id", "data"],
            ),
            Self::DeleteRecord => (
                "Delete a record by Id.",
                json!({
                    "object_name": string_prop("API name of the object"),
                    "record_id": string_prop("Salesforce record Id"),
                }),
                &["object_name", "record_id"],
            ),
            Self::DescribeObject => (
                "Describe an object: labels, key prefix, record types, relationships and fields.",
                json!({ "object_name": string_prop("API name of the object, e.g. Opportunity") }),
                &["object_name"],
            ),
        };

        let argument_schema = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        OperationDescriptor {
            name: self.as_str().to_string(),
            description: description.to_string(),
            argument_schema,
            required_arguments: required.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationName {
    type Err = DispatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| DispatchError::UnknownOperation { name: value.to_string() })
    }
}

fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn fields_prop() -> Value {
    json!({
        "type": "array",
        "description": "Custom fields to create",
        "items": {
            "type": "object",
            "properties": {
                "label": { "type": "string" },
                "api_name": { "type": "string", "description": "Optional; derived from label with suffix __c" },
                "type": { "type": "string", "description": "Text, Number, Checkbox, Date, DateTime, Currency, Percent, Email, Phone, Url, TextArea, LongTextArea, Picklist, Lookup" },
                "length": { "type": "integer" },
                "precision": { "type": "integer" },
                "scale": { "type": "integer" },
                "required": { "type": "boolean" },
                "picklist_values": { "type": "array", "items": { "type": "string" } },
                "reference_to": { "type": "string", "description": "Target object for Lookup fields" }
            },
            "required": ["label", "type"]
        }
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub argument_schema: Map<String, Value>,
    pub required_arguments: Vec<String>,
}

impl OperationDescriptor {
    /// JSON-Schema object for the host protocol.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(self.argument_schema.clone()));
        schema.insert(
            "required".to_string(),
            Value::Array(self.required_arguments.iter().cloned().map(Value::String).collect()),
        );
        schema
    }

    pub fn missing_arguments<'a>(&'a self, args: &Map<String, Value>) -> Vec<&'a str> {
        self.required_arguments
            .iter()
            .filter(|name| args.get(name.as_str()).map(Value::is_null).unwrap_or(true))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct Registry {
    descriptors: Vec<OperationDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::catalog()
    }
}

impl Registry {
    pub fn catalog() -> Self {
        Self { descriptors: OperationName::ALL.iter().map(OperationName::descriptor).collect() }
    }

    pub fn list(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.name == name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use serde_json::json;

    use super::{Handler, OperationCategory, OperationName, Registry};
    use crate::errors::DispatchError;

    #[test]
    fn catalog_names_are_unique_and_in_stable_order() {
        let registry = Registry::catalog();
        let names = registry.list().iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        let unique = names.iter().collect::<BTreeSet<_>>();

        assert_eq!(names.len(), 17);
        assert_eq!(unique.len(), names.len(), "registry names must be unique");
        assert_eq!(names.first(), Some(&"create_object"));
        assert_eq!(names.last(), Some(&"describe_object"));
        assert_eq!(registry.list(), Registry::catalog().list(), "catalog order must be stable");
    }

    #[test]
    fn every_descriptor_has_exactly_one_route() {
        let registry = Registry::catalog();
        let mut routes = BTreeMap::new();
        for name in OperationName::ALL {
            assert!(routes.insert(name.as_str(), name.handler()).is_none());
        }

        for descriptor in registry.list() {
            let parsed: OperationName = descriptor.name.parse().expect("descriptor name routes");
            assert_eq!(parsed.as_str(), descriptor.name);
            assert!(routes.contains_key(descriptor.name.as_str()));
        }
        assert_eq!(routes.len(), registry.len(), "no orphaned routes");
    }

    #[test]
    fn aliases_share_a_handler() {
        assert_eq!(
            OperationName::CreateCustomField.handler(),
            OperationName::CreateObjectWithFields.handler()
        );
        assert_eq!(
            OperationName::CreateCustomMetadataField.handler(),
            Handler::CreateCustomMetadataType
        );
        let handlers = OperationName::ALL.iter().map(|n| n.handler()).collect::<BTreeSet<_>>();
        assert_eq!(handlers.len(), 15);
    }

    #[test]
    fn unknown_name_fails_to_parse_with_the_name() {
        let error = "drop_database".parse::<OperationName>().expect_err("must fail");
        assert_eq!(error, DispatchError::UnknownOperation { name: "drop_database".to_string() });
    }

    #[test]
    fn required_arguments_are_declared_properties() {
        for descriptor in Registry::catalog().list() {
            for required in &descriptor.required_arguments {
                assert!(
                    descriptor.argument_schema.contains_key(required),
                    "{} requires undeclared argument {required}",
                    descriptor.name
                );
            }
            let schema = descriptor.input_schema();
            assert_eq!(schema["type"], "object");
        }
    }

    #[test]
    fn missing_arguments_treats_null_as_absent() {
        let descriptor = OperationName::UpdateRecord.descriptor();
        let args = json!({ "object_name": "Account", "record_id": null });
        let missing = descriptor.missing_arguments(args.as_object().expect("object"));
        assert_eq!(missing, vec!["record_id", "data"]);
    }

    #[test]
    fn data_operations_are_categorized() {
        assert_eq!(OperationName::RunSoqlQuery.category(), OperationCategory::Data);
        assert_eq!(OperationName::CreateTab.category(), OperationCategory::Metadata);
        assert_eq!(OperationCategory::Data.as_str(), "data");
    }
}
