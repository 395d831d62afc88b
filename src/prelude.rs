//! Convenience re-exports for common use.

pub use crate::config::TooltraceConfig;
pub use crate::dispatch::{DispatchLoop, DispatchOutcome, DispatchPolicy, Termination};
pub use crate::error::{Result, TooltraceError};
#[cfg(feature = "azure")]
pub use crate::provider::AzureInferenceClient;
pub use crate::provider::{ChatCompletionsClient, CompletionRequest, CompletionResult, InstrumentedClient};
pub use crate::telemetry::{current_span, ConsoleSpanExporter, SpanHandle, Tracer};
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments, ToolExecutionContext, ToolRegistry};
pub use crate::types::{Conversation, FinishReason, GenerationSettings, ModelMessage, Role, Usage};
