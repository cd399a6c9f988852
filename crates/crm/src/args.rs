use serde_json::{Map, Value};
use sfmcp_core::{ArgumentMapping, OperationError};

pub fn required_str<'a>(args: &'a ArgumentMapping, key: &str) -> Result<&'a str, OperationError> {
    optional_str(args, key).ok_or_else(|| OperationError::invalid(format!("`{key}` is required")))
}

pub fn optional_str<'a>(args: &'a ArgumentMapping, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

pub fn required_object<'a>(
    args: &'a ArgumentMapping,
    key: &str,
) -> Result<&'a Map<String, Value>, OperationError> {
    args.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| OperationError::invalid(format!("`{key}` must be an object")))
}

pub fn string_list(args: &ArgumentMapping, key: &str) -> Result<Vec<String>, OperationError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(single)) => Ok(vec![single.trim().to_string()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|value| value.trim().to_string())
                    .ok_or_else(|| OperationError::invalid(format!("`{key}` must contain strings")))
            })
            .collect(),
        Some(_) => Err(OperationError::invalid(format!("`{key}` must be a list of strings"))),
    }
}

pub fn object_list<'a>(
    args: &'a ArgumentMapping,
    key: &str,
) -> Result<Vec<&'a Map<String, Value>>, OperationError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| OperationError::invalid(format!("`{key}` must contain objects")))
            })
            .collect(),
        Some(Value::Object(single)) => Ok(vec![single]),
        Some(_) => Err(OperationError::invalid(format!("`{key}` must be a list of objects"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{object_list, optional_str, required_str, string_list};
    use sfmcp_core::{ArgumentMapping, OperationError};

    fn args(value: serde_json::Value) -> ArgumentMapping {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let args = args(json!({"object_name": "  ", "query": " SELECT Id FROM Account "}));

        assert_eq!(optional_str(&args, "object_name"), None);
        assert_eq!(required_str(&args, "query"), Ok("SELECT Id FROM Account"));
        assert_eq!(
            required_str(&args, "object_name"),
            Err(OperationError::InvalidArguments("`object_name` is required".to_string()))
        );
    }

    #[test]
    fn string_list_accepts_single_value_and_arrays() {
        let single = args(json!({"field_names": "Amount__c"}));
        let many = args(json!({"field_names": ["Amount__c", " Due__c "]}));
        let bad = args(json!({"field_names": [1]}));

        assert_eq!(string_list(&single, "field_names"), Ok(vec!["Amount__c".to_string()]));
        assert_eq!(
            string_list(&many, "field_names"),
            Ok(vec!["Amount__c".to_string(), "Due__c".to_string()])
        );
        assert!(string_list(&bad, "field_names").is_err());
        assert_eq!(string_list(&ArgumentMapping::new(), "field_names"), Ok(Vec::new()));
    }

    #[test]
    fn object_list_wraps_a_single_object() {
        let single = args(json!({"fields": {"label": "Amount", "type": "Currency"}}));
        assert_eq!(object_list(&single, "fields").map(|list| list.len()), Ok(1));
        assert!(object_list(&args(json!({"fields": "Amount"})), "fields").is_err());
    }
}
