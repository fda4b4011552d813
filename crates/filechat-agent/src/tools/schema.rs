//! Structural validation of tool arguments against a JSON schema
//!
//! Supports the subset of JSON Schema the tool schemas use: `type` (a name or
//! a list of names), `properties`, `required`, `additionalProperties: false`
//! and `items`.

use serde_json::{Map, Value as JsonValue};

/// Check `value` against `schema`. The error names the offending location.
pub fn validate(schema: &JsonValue, value: &JsonValue) -> Result<(), String> {
    validate_at(schema, value, "input")
}

fn validate_at(schema: &JsonValue, value: &JsonValue, location: &str) -> Result<(), String> {
    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            JsonValue::String(name) => vec![name.as_str()],
            JsonValue::Array(names) => names.iter().filter_map(JsonValue::as_str).collect(),
            _ => Vec::new(),
        };

        if !allowed.is_empty() && !allowed.iter().any(|name| matches_type(name, value)) {
            return Err(format!(
                "{} must be of type {}, got {}",
                location,
                allowed.join(" or "),
                type_name(value)
            ));
        }
    }

    match value {
        JsonValue::Object(fields) => validate_object(schema, fields, location),
        JsonValue::Array(items) => match schema.get("items") {
            Some(item_schema) => items.iter().enumerate().try_for_each(|(i, item)| {
                validate_at(item_schema, item, &format!("{}[{}]", location, i))
            }),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

fn validate_object(
    schema: &JsonValue,
    fields: &Map<String, JsonValue>,
    location: &str,
) -> Result<(), String> {
    let properties = schema.get("properties").and_then(JsonValue::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(JsonValue::as_array)
        .map(|names| names.iter().filter_map(JsonValue::as_str).collect())
        .unwrap_or_default();

    for name in &required {
        match fields.get(*name) {
            None | Some(JsonValue::Null) => {
                return Err(format!("{} is missing required field '{}'", location, name));
            }
            Some(_) => {}
        }
    }

    let closed = schema.get("additionalProperties") == Some(&JsonValue::Bool(false));

    for (name, field) in fields {
        let field_location = format!("{}.{}", location, name);
        match properties.and_then(|props| props.get(name)) {
            // Optional fields may be sent as explicit nulls
            Some(_) if field.is_null() && !required.contains(&name.as_str()) => {}
            Some(field_schema) => validate_at(field_schema, field, &field_location)?,
            None if closed => {
                return Err(format!("{} has unexpected field '{}'", location, name));
            }
            None => {}
        }
    }

    Ok(())
}

fn matches_type(name: &str, value: &JsonValue) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => true,
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edit_schema() -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "old_str": { "type": "string" },
                "new_str": { "type": "string" },
                "count": { "type": "integer" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["path", "old_str", "new_str"],
            "additionalProperties": false
        })
    }

    #[test]
    fn test_valid_input() {
        let input = json!({"path": "a.txt", "old_str": "a", "new_str": "b"});
        assert!(validate(&edit_schema(), &input).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let input = json!({"path": "a.txt", "old_str": "a"});
        let err = validate(&edit_schema(), &input).unwrap_err();
        assert_eq!(err, "input is missing required field 'new_str'");
    }

    #[test]
    fn test_wrong_field_type() {
        let input = json!({"path": 42, "old_str": "a", "new_str": "b"});
        let err = validate(&edit_schema(), &input).unwrap_err();
        assert_eq!(err, "input.path must be of type string, got number");
    }

    #[test]
    fn test_non_object_input() {
        let err = validate(&edit_schema(), &json!("a.txt")).unwrap_err();
        assert_eq!(err, "input must be of type object, got string");
    }

    #[test]
    fn test_unexpected_field_rejected_when_closed() {
        let input = json!({"path": "a", "old_str": "a", "new_str": "b", "force": true});
        let err = validate(&edit_schema(), &input).unwrap_err();
        assert!(err.contains("unexpected field 'force'"));
    }

    #[test]
    fn test_integer_and_array_items() {
        let base = json!({"path": "a", "old_str": "a", "new_str": "b"});

        let mut ok = base.clone();
        ok["count"] = json!(3);
        ok["tags"] = json!(["x", "y"]);
        assert!(validate(&edit_schema(), &ok).is_ok());

        let mut bad_count = base.clone();
        bad_count["count"] = json!(1.5);
        assert!(validate(&edit_schema(), &bad_count).is_err());

        let mut bad_item = base;
        bad_item["tags"] = json!(["x", 2]);
        let err = validate(&edit_schema(), &bad_item).unwrap_err();
        assert!(err.starts_with("input.tags[1]"));
    }

    #[test]
    fn test_optional_null_is_allowed() {
        let schema = json!({
            "type": "object",
            "properties": { "path": { "type": "string" } }
        });
        assert!(validate(&schema, &json!({"path": null})).is_ok());
        assert!(validate(&schema, &json!({})).is_ok());
    }
}
