//! Typed access to tool call arguments.

use crate::error::TooltraceError;

/// Arguments of one tool call, always a JSON object.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse the textual payload sent by the model.
    ///
    /// A blank payload means "no arguments". Anything else must be a JSON
    /// object.
    pub fn parse(tool_name: &str, payload: &str) -> Result<Self, TooltraceError> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|e| TooltraceError::ToolArgument {
                tool_name: tool_name.to_string(),
                message: format!("arguments are not valid JSON: {e}"),
            })?;
        if !value.is_object() {
            return Err(TooltraceError::ToolArgument {
                tool_name: tool_name.to_string(),
                message: "arguments must be a JSON object".to_string(),
            });
        }
        Ok(Self::new(value))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// A required string argument.
    pub fn get_str(&self, key: &str) -> Result<&str, TooltraceError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| TooltraceError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// The whole argument object as `T`.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, TooltraceError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            TooltraceError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_payload_is_empty_object() {
        let args = ToolArguments::parse("noop", "   ").unwrap();
        assert_eq!(args.raw(), &serde_json::json!({}));
    }

    #[test]
    fn single_quoted_payload_is_rejected() {
        let err = ToolArguments::parse("get_weather", "{'city': 'Seattle'}").unwrap_err();
        assert!(
            matches!(err, TooltraceError::ToolArgument { ref tool_name, .. } if tool_name == "get_weather")
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = ToolArguments::parse("get_weather", "[\"Seattle\"]").unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }
}
