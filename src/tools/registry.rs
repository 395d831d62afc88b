//! Name-indexed tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::validation::validate_arguments;
use crate::error::{Result, TooltraceError};
use crate::provider::ToolDefinition;

/// Tools available to the dispatch loop, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Register a tool, replacing any tool with the same name.
    ///
    /// The replacement keeps the slot of the tool it replaces, so declaration
    /// order is stable. Returns the replaced tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                tracing::warn!(tool = %name, "tool registered twice; replacing previous definition");
                Some(std::mem::replace(&mut self.tools[slot], tool))
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
                None
            }
        }
    }

    /// Register a tool, failing if the name is taken.
    pub fn try_register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.index.contains_key(tool.name()) {
            return Err(TooltraceError::DuplicateTool(tool.name().to_string()));
        }
        self.register(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations advertised to the completion service.
    pub fn declarations(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Parse `payload`, validate it and run the named tool.
    ///
    /// Failures are reported as `ToolNotFound`, `ToolArgument` or
    /// `ToolExecution`.
    pub async fn invoke(
        &self,
        name: &str,
        payload: &str,
        ctx: &ToolExecutionContext,
    ) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| TooltraceError::ToolNotFound(name.to_string()))?;

        let args = ToolArguments::parse(name, payload)?;
        validate_arguments(name, args.raw(), &tool.parameters().schema)?;

        match tool.execute(args, ctx).await {
            Ok(value) => Ok(result_to_text(&value)),
            Err(e) if e.is_tool_failure() => Err(e),
            Err(TooltraceError::InvalidArgument(message)) => Err(TooltraceError::ToolArgument {
                tool_name: name.to_string(),
                message,
            }),
            Err(other) => Err(TooltraceError::ToolExecution {
                tool_name: name.to_string(),
                message: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Strings pass through verbatim; other values are serialized.
fn result_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
