//! Check tool call arguments against a declared parameter schema.

use crate::error::{Result, TooltraceError};

/// Validate tool arguments against a JSON Schema.
///
/// Top-level only: schema type, required fields and declared property
/// types. The first violation becomes a `ToolArgument` error.
pub fn validate_arguments(
    tool_name: &str,
    args: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<()> {
    check(args, schema).map_err(|message| TooltraceError::ToolArgument {
        tool_name: tool_name.to_string(),
        message,
    })
}

fn check(args: &serde_json::Value, schema: &serde_json::Value) -> std::result::Result<(), String> {
    if schema.get("type").and_then(|v| v.as_str()) == Some("object") && !args.is_object() {
        return Err(format!("expected object arguments, got {}", json_type_name(args)));
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    let required = schema.get("required").and_then(|v| v.as_array());
    if let Some(name) = required
        .into_iter()
        .flatten()
        .filter_map(|f| f.as_str())
        .find(|name| !obj.contains_key(*name))
    {
        return Err(format!("missing required parameter '{name}'"));
    }

    if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
        for (key, value) in obj {
            let expected = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(|t| t.as_str());
            if let Some(expected) = expected {
                if !value_matches_type(value, expected) {
                    return Err(format!(
                        "parameter '{key}' expected type '{expected}', got {}",
                        json_type_name(value)
                    ));
                }
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &serde_json::Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
