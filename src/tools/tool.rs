//! The `Tool` contract and a closure-backed implementation.

use std::future::Future;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;

use super::arguments::ToolArguments;
use super::types::AgentToolParameters;
use crate::error::TooltraceError;
use crate::provider::ToolDefinition;
use crate::telemetry::{AttributeValue, SpanHandle};
use crate::types::ToolCall;

/// Per-call state handed to a tool: the call being answered and the
/// `execute_tool` span it runs in.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    call_id: Option<String>,
    tool_name: Option<String>,
    span: SpanHandle,
}

impl ToolExecutionContext {
    /// Context that is not tied to a model tool call.
    pub fn new(span: SpanHandle) -> Self {
        Self {
            span,
            ..Self::default()
        }
    }

    /// Context for answering `call` inside `span`.
    pub fn for_call(call: &ToolCall, span: SpanHandle) -> Self {
        Self {
            call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
            span,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// No-op when tracing is off.
    pub fn span(&self) -> &SpanHandle {
        &self.span
    }

    /// Tag the invocation span with a tool-specific attribute.
    pub fn record(&self, key: &str, value: impl Into<AttributeValue>) {
        self.span.set_attribute(key, value);
    }
}

/// Something the model can call by name.
///
/// The registry validates arguments against [`Tool::parameters`] before
/// `execute` runs. Returning [`TooltraceError::InvalidArgument`] reports a bad
/// argument to the model; any other error is reported as a failed execution.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &AgentToolParameters;

    /// Declaration advertised to the completion service.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }

    async fn execute(
        &self,
        args: ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, TooltraceError>;
}

type Handler = Box<
    dyn Fn(
            ToolArguments,
            ToolExecutionContext,
        ) -> BoxFuture<'static, Result<serde_json::Value, TooltraceError>>
        + Send
        + Sync,
>;

/// Tool backed by an async closure.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Handler,
}

impl AgentTool {
    /// Closure receiving the raw [`ToolArguments`].
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, TooltraceError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Box::new(move |args, ctx| handler(args, ctx).boxed()),
        }
    }

    /// Closure receiving the arguments deserialized into `A`.
    ///
    /// Arguments that do not fit `A` fail with `InvalidArgument` before the
    /// closure runs.
    pub fn typed<A, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, TooltraceError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Box::new(move |args, ctx| match args.deserialize::<A>() {
                Ok(typed) => handler(typed, ctx).boxed(),
                Err(e) => futures::future::ready(Err(e)).boxed(),
            }),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, TooltraceError> {
        (self.handler)(args, ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Pair {
        left: i64,
        right: i64,
    }

    fn adder() -> AgentTool {
        AgentTool::typed(
            "add",
            "Adds two integers",
            AgentToolParameters::object()
                .integer("left", "left operand", true)
                .integer("right", "right operand", true)
                .build(),
            |pair: Pair, ctx| async move {
                ctx.record("operands", 2i64);
                Ok(json!(pair.left + pair.right))
            },
        )
    }

    #[tokio::test]
    async fn typed_tool_receives_deserialized_arguments() {
        let args = ToolArguments::new(json!({ "left": 2, "right": 40 }));
        let out = adder()
            .execute(args, &ToolExecutionContext::default())
            .await
            .unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn typed_tool_rejects_mismatched_arguments() {
        let args = ToolArguments::new(json!({ "left": "two" }));
        let err = adder()
            .execute(args, &ToolExecutionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TooltraceError::InvalidArgument(_)));
    }

    #[test]
    fn definition_mirrors_name_description_and_schema() {
        let tool = adder();
        let def = tool.definition();
        assert_eq!(def.name, "add");
        assert_eq!(def.description, "Adds two integers");
        assert_eq!(def.parameters, tool.parameters().schema);
    }

    #[test]
    fn context_for_call_carries_call_identity() {
        let call = ToolCall {
            id: "call_7".into(),
            name: "add".into(),
            arguments: "{}".into(),
        };
        let ctx = ToolExecutionContext::for_call(&call, SpanHandle::noop());
        assert_eq!(ctx.call_id(), Some("call_7"));
        assert_eq!(ctx.tool_name(), Some("add"));
        assert!(ToolExecutionContext::default().call_id().is_none());
    }
}
