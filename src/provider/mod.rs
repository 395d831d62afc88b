//! Chat-completion client trait and implementations.

pub mod http;
pub mod instrumented;

#[cfg(feature = "azure")]
pub mod azure;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TooltraceError;
use crate::types::{FinishReason, GenerationSettings, ModelMessage, ToolCall, Usage};

#[cfg(feature = "azure")]
pub use azure::AzureInferenceClient;
pub use instrumented::InstrumentedClient;

/// A request sent to a completion service.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Full conversation, in order.
    pub messages: Vec<ModelMessage>,
    /// Tools the model may call, in registration order.
    pub tools: Vec<ToolDefinition>,
    pub settings: GenerationSettings,
}

/// Tool declaration sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Structured response from a completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub id: Option<String>,
    /// Model that actually served the request, when reported.
    pub model: Option<String>,
    pub finish_reason: FinishReason,
    /// The assistant message, including any tool calls.
    pub message: ModelMessage,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

impl CompletionResult {
    /// Assistant text, empty when the model only requested tools.
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Whether the dispatch loop must run tools before asking again.
    pub fn wants_tools(&self) -> bool {
        self.finish_reason.requests_tools() && !self.tool_calls.is_empty()
    }
}

/// A remote service that answers chat-completion requests.
#[async_trait]
pub trait ChatCompletionsClient: Send + Sync {
    /// Service identifier recorded as `gen_ai.system` (e.g. "az.ai.inference").
    fn provider_name(&self) -> &str;

    /// Base endpoint, recorded as `server.address` when known.
    fn endpoint(&self) -> Option<&str> {
        None
    }

    /// Model used when the request settings do not name one.
    fn default_model(&self) -> Option<&str> {
        None
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, TooltraceError>;
}

#[async_trait]
impl<C: ChatCompletionsClient + ?Sized> ChatCompletionsClient for std::sync::Arc<C> {
    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn endpoint(&self) -> Option<&str> {
        (**self).endpoint()
    }

    fn default_model(&self) -> Option<&str> {
        (**self).default_model()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, TooltraceError> {
        (**self).complete(request).await
    }
}
