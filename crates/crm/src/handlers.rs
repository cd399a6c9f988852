use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sfmcp_core::{
    ArgumentMapping, HandlerResult, OperationError, OperationHandlers, OperationResult,
};
use tracing::{info, warn};

use crate::args::{object_list, optional_str, required_object, required_str, string_list};
use crate::metadata::{
    api_name, app_metadata, custom_metadata_type_metadata, custom_object_metadata,
    field_definition, tab_metadata, CUSTOM_METADATA_SUFFIX, CUSTOM_OBJECT_SUFFIX,
};
use crate::org::{Api, SalesforceOrg};

const FOLDER_ACCESS_TYPES: [&str; 4] = ["Public", "Hidden", "Shared", "PublicInternal"];

/// Object and field names end up in URL paths and SOQL literals, so only identifier
/// characters are accepted.
fn identifier<'a>(args: &'a ArgumentMapping, key: &str) -> Result<&'a str, OperationError> {
    let value = required_str(args, key)?;
    if is_identifier(value) {
        Ok(value)
    } else {
        Err(OperationError::invalid(format!("`{key}` is not a valid Salesforce API name: {value}")))
    }
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Drop the per-record `attributes` envelope Salesforce adds to query results.
pub fn strip_attributes(records: &[Value]) -> Vec<Value> {
    records
        .iter()
        .map(|record| match record {
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != "attributes")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect()
}

/// Compact field listing from a describe payload.
pub fn field_summaries(describe: &Value) -> Vec<Value> {
    let Some(fields) = describe.get("fields").and_then(Value::as_array) else {
        return Vec::new();
    };

    fields
        .iter()
        .map(|field| {
            let mut summary = json!({
                "name": field["name"],
                "label": field["label"],
                "type": field["type"],
                "required": field["nillable"] == false && field["createable"] == true
                    && field["defaultedOnCreate"] != true,
                "custom": field["custom"],
            });
            if field["length"].as_u64().unwrap_or(0) > 0 {
                summary["length"] = field["length"].clone();
            }
            let picklist = field
                .get("picklistValues")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter(|value| value["active"] != false)
                        .filter_map(|value| value.get("value").cloned())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            if !picklist.is_empty() {
                summary["picklistValues"] = Value::Array(picklist);
            }
            if field["referenceTo"].as_array().map(|targets| !targets.is_empty()).unwrap_or(false)
            {
                summary["referenceTo"] = field["referenceTo"].clone();
            }
            summary
        })
        .collect()
}

pub fn describe_summary(describe: &Value) -> Value {
    let record_types = describe
        .get("recordTypeInfos")
        .and_then(Value::as_array)
        .map(|infos| infos.iter().filter_map(|info| info.get("name").cloned()).collect::<Vec<_>>())
        .unwrap_or_default();
    let child_relationships = describe
        .get("childRelationships")
        .and_then(Value::as_array)
        .map(|relationships| {
            relationships
                .iter()
                .filter_map(|relationship| relationship.get("relationshipName"))
                .filter(|name| !name.is_null())
                .cloned()
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    json!({
        "name": describe["name"],
        "label": describe["label"],
        "labelPlural": describe["labelPlural"],
        "keyPrefix": describe["keyPrefix"],
        "custom": describe["custom"],
        "createable": describe["createable"],
        "updateable": describe["updateable"],
        "deletable": describe["deletable"],
        "queryable": describe["queryable"],
        "recordTypes": record_types,
        "childRelationships": child_relationships,
        "fields": field_summaries(describe),
    })
}

/// `FieldDefinition.DurableId` is `<objectId>.<fieldId>`; the tooling `CustomField`
/// id is the second half.
pub fn custom_field_id(durable_id: &str) -> Option<&str> {
    durable_id.rsplit_once('.').map(|(_, id)| id).filter(|id| !id.is_empty())
}

fn record_url(instance_url: Option<String>, id: &str) -> Option<String> {
    instance_url.map(|instance| format!("{instance}/{id}"))
}

#[derive(Default)]
struct FieldOutcome {
    created: Vec<String>,
    failed: Vec<String>,
}

impl FieldOutcome {
    fn into_result(self, object: &str, object_created: bool) -> OperationResult {
        let mut lines = Vec::new();
        if object_created {
            lines.push(format!("Created {object}."));
        }
        if !self.created.is_empty() {
            lines.push(format!("Added fields to {object}: {}", self.created.join(", ")));
        }
        lines.extend(self.failed.iter().map(|failure| format!("Failed: {failure}")));
        if lines.is_empty() {
            lines.push(format!("{object} already exists; no fields were requested."));
        }

        let text = lines.join("\n");
        if self.failed.is_empty() {
            OperationResult::text(text)
        } else {
            OperationResult::error_text(text)
        }
    }
}

impl SalesforceOrg {
    async fn object_exists(&self, object: &str) -> Result<bool, OperationError> {
        match self.get(Api::Data, &format!("/sobjects/{object}/describe")).await {
            Ok(_) => Ok(true),
            Err(OperationError::Api { status: 404, .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// The name as given when it exists, else its suffixed form when that exists.
    async fn existing_container(
        &self,
        name: &str,
        suffix: &str,
    ) -> Result<Option<String>, OperationError> {
        if self.object_exists(name).await? {
            return Ok(Some(name.to_string()));
        }
        let suffixed = api_name(name, suffix);
        if suffixed != name && self.object_exists(&suffixed).await? {
            return Ok(Some(suffixed));
        }
        Ok(None)
    }

    async fn create_custom_object(&self, full_name: &str, metadata: Value) -> HandlerResult {
        let body = json!({ "FullName": full_name, "Metadata": metadata });
        let response = self.post(Api::Tooling, "/sobjects/CustomObject", &body).await?;
        info!(
            event_name = "salesforce.object_created",
            object = %full_name,
            "custom object created"
        );
        Ok(OperationResult::text(format!(
            "Created {full_name} (id {}).",
            response["id"].as_str().unwrap_or("unknown")
        )))
    }

    async fn add_fields(&self, object: &str, fields: &[&Map<String, Value>]) -> FieldOutcome {
        let mut outcome = FieldOutcome::default();
        for entry in fields {
            let definition = match field_definition(entry) {
                Ok(definition) => definition,
                Err(error) => {
                    outcome.failed.push(error.to_string());
                    continue;
                }
            };
            let full_name = format!("{object}.{}", definition.api_name);
            let body = json!({ "FullName": full_name, "Metadata": definition.metadata });
            match self.post(Api::Tooling, "/sobjects/CustomField", &body).await {
                Ok(_) => outcome.created.push(definition.api_name),
                Err(error) => {
                    warn!(
                        event_name = "salesforce.field_create_failed",
                        field = %full_name,
                        error = %error,
                        "custom field creation failed"
                    );
                    outcome.failed.push(format!("{full_name}: {error}"));
                }
            }
        }
        outcome
    }

    /// Shared by objects and custom metadata types: create the container when a label
    /// pair is given and it does not exist yet, then add every requested field.
    ///
    /// An explicit container name is tried as given first, so standard objects such as
    /// `Account` can receive fields. A container that has to be created always gets
    /// the suffix.
    async fn ensure_with_fields(
        &self,
        args: &ArgumentMapping,
        suffix: &str,
        container_key: &str,
    ) -> HandlerResult {
        let label = optional_str(args, "name");
        let explicit = optional_str(args, container_key).or_else(|| optional_str(args, "api_name"));
        let object = match (explicit, label) {
            (Some(name), _) if is_identifier(name) => name.to_string(),
            (Some(name), _) => {
                return Err(OperationError::invalid(format!(
                    "`{container_key}` is not a valid Salesforce API name: {name}"
                )))
            }
            (None, Some(label)) => api_name(label, suffix),
            (None, None) => {
                return Err(OperationError::invalid(format!(
                    "`name` or `{container_key}` is required"
                )))
            }
        };
        let fields = object_list(args, "fields")?;

        let mut object_created = false;
        let object = if let Some(existing) = self.existing_container(&object, suffix).await? {
            existing
        } else {
            let object = api_name(&object, suffix);
            let (Some(label), Some(plural)) = (label, optional_str(args, "plural_name")) else {
                return Err(OperationError::invalid(format!(
                    "{object} does not exist; provide `name` and `plural_name` to create it"
                )));
            };
            let description = optional_str(args, "description");
            let metadata = if suffix == CUSTOM_METADATA_SUFFIX {
                custom_metadata_type_metadata(label, plural, description)
            } else {
                custom_object_metadata(label, plural, description)
            };
            self.create_custom_object(&object, metadata).await?;
            object_created = true;
            object
        };

        Ok(self.add_fields(&object, &fields).await.into_result(&object, object_created))
    }

    async fn create_folder(&self, args: &ArgumentMapping, folder_type: &str) -> HandlerResult {
        let name = required_str(args, "folder_name")?;
        let access_type = optional_str(args, "access_type").unwrap_or("Public");
        let access_type = FOLDER_ACCESS_TYPES
            .iter()
            .find(|known| known.eq_ignore_ascii_case(access_type))
            .ok_or_else(|| {
                OperationError::invalid(format!(
                    "`access_type` must be one of {}",
                    FOLDER_ACCESS_TYPES.join(", ")
                ))
            })?;

        let body = json!({
            "Name": name,
            "DeveloperName": api_name(name, ""),
            "AccessType": access_type,
            "Type": folder_type,
        });
        let response = self.post(Api::Data, "/sobjects/Folder", &body).await?;
        Ok(OperationResult::text(format!(
            "{folder_type} folder '{name}' created (id {}).",
            response["id"].as_str().unwrap_or("unknown")
        )))
    }
}

#[async_trait]
impl OperationHandlers for SalesforceOrg {
    fn is_connected(&self) -> bool {
        self.connected()
    }

    async fn create_object(&self, args: &ArgumentMapping) -> HandlerResult {
        let label = required_str(args, "name")?;
        let plural = required_str(args, "plural_name")?;
        let object =
            api_name(optional_str(args, "api_name").unwrap_or(label), CUSTOM_OBJECT_SUFFIX);
        let metadata = custom_object_metadata(label, plural, optional_str(args, "description"));
        self.create_custom_object(&object, metadata).await
    }

    async fn create_object_with_fields(&self, args: &ArgumentMapping) -> HandlerResult {
        self.ensure_with_fields(args, CUSTOM_OBJECT_SUFFIX, "object_name").await
    }

    async fn delete_object_fields(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let field_names = string_list(args, "field_names")?;
        if field_names.is_empty() {
            return Err(OperationError::invalid("`field_names` must list at least one field"));
        }

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for field in field_names {
            let field = api_name(&field, CUSTOM_OBJECT_SUFFIX);
            let soql = format!(
                "SELECT DurableId FROM FieldDefinition \
                 WHERE EntityDefinition.QualifiedApiName = '{object}' \
                 AND QualifiedApiName = '{field}'"
            );
            // Earlier fields may already be gone; keep going so they are still reported.
            let found = match self.query(Api::Tooling, &soql).await {
                Ok(found) => found,
                Err(error) => {
                    failed.push(format!("{object}.{field}: lookup failed: {error}"));
                    continue;
                }
            };
            let field_id = found["records"]
                .get(0)
                .and_then(|record| record["DurableId"].as_str())
                .and_then(custom_field_id)
                .map(str::to_string);
            let Some(field_id) = field_id else {
                failed.push(format!("{object}.{field}: field not found"));
                continue;
            };

            match self.delete(Api::Tooling, &format!("/sobjects/CustomField/{field_id}")).await {
                Ok(_) => deleted.push(field),
                Err(error) => failed.push(format!("{object}.{field}: {error}")),
            }
        }

        let mut lines = Vec::new();
        if !deleted.is_empty() {
            lines.push(format!("Deleted fields from {object}: {}", deleted.join(", ")));
        }
        lines.extend(failed.iter().map(|failure| format!("Failed: {failure}")));
        let text = lines.join("\n");
        Ok(if failed.is_empty() {
            OperationResult::text(text)
        } else {
            OperationResult::error_text(text)
        })
    }

    async fn create_custom_metadata_type(&self, args: &ArgumentMapping) -> HandlerResult {
        self.ensure_with_fields(args, CUSTOM_METADATA_SUFFIX, "api_name").await
    }

    async fn create_tab(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let metadata = tab_metadata(optional_str(args, "motif"), optional_str(args, "description"));
        let body = json!({ "FullName": object, "Metadata": metadata });
        self.post(Api::Tooling, "/sobjects/CustomTab", &body).await?;
        Ok(OperationResult::text(format!("Created tab for {object}.")))
    }

    async fn create_custom_app(&self, args: &ArgumentMapping) -> HandlerResult {
        let label = required_str(args, "label")?;
        let developer_name = api_name(optional_str(args, "api_name").unwrap_or(label), "");
        let tabs = string_list(args, "tabs")?;
        let metadata = app_metadata(label, optional_str(args, "description"), &tabs);
        let body = json!({ "FullName": developer_name, "Metadata": metadata });
        self.post(Api::Tooling, "/sobjects/CustomApplication", &body).await?;
        Ok(OperationResult::text(format!("Created app '{label}' ({developer_name}).")))
    }

    async fn create_report_folder(&self, args: &ArgumentMapping) -> HandlerResult {
        self.create_folder(args, "Report").await
    }

    async fn create_dashboard_folder(&self, args: &ArgumentMapping) -> HandlerResult {
        self.create_folder(args, "Dashboard").await
    }

    async fn run_soql_query(&self, args: &ArgumentMapping) -> HandlerResult {
        let soql = required_str(args, "query")?;
        let response = self.query(Api::Data, soql).await?;
        let records = response["records"].as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(OperationResult::json(&json!({
            "totalSize": response["totalSize"],
            "done": response["done"],
            "records": strip_attributes(records),
        })))
    }

    async fn run_sosl_search(&self, args: &ArgumentMapping) -> HandlerResult {
        let sosl = required_str(args, "search")?;
        let response =
            self.request(reqwest::Method::GET, Api::Data, "/search", &[("q", sosl)], None).await?;
        let records = response["searchRecords"].as_array().map(Vec::as_slice).unwrap_or_default();
        Ok(OperationResult::json(&json!({ "searchRecords": strip_attributes(records) })))
    }

    async fn get_object_fields(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let describe = self.get(Api::Data, &format!("/sobjects/{object}/describe")).await?;
        Ok(OperationResult::json(&Value::Array(field_summaries(&describe))))
    }

    async fn create_record(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let data = required_object(args, "data")?;
        let body = Value::Object(data.clone());
        let response = self.post(Api::Data, &format!("/sobjects/{object}"), &body).await?;
        let id = response["id"].as_str().unwrap_or_default().to_string();
        Ok(OperationResult::json(&json!({
            "id": id,
            "success": response["success"],
            "url": record_url(self.instance_url(), &id),
        })))
    }

    async fn update_record(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let record_id = identifier(args, "record_id")?;
        let data = required_object(args, "data")?;
        let body = Value::Object(data.clone());
        self.patch(Api::Data, &format!("/sobjects/{object}/{record_id}"), &body).await?;
        Ok(OperationResult::text(format!("Updated {object} record {record_id}.")))
    }

    async fn delete_record(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let record_id = identifier(args, "record_id")?;
        self.delete(Api::Data, &format!("/sobjects/{object}/{record_id}")).await?;
        Ok(OperationResult::text(format!("Deleted {object} record {record_id}.")))
    }

    async fn describe_object(&self, args: &ArgumentMapping) -> HandlerResult {
        let object = identifier(args, "object_name")?;
        let describe = self.get(Api::Data, &format!("/sobjects/{object}/describe")).await?;
        Ok(OperationResult::json(&describe_summary(&describe)))
    }
}
