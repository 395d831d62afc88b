//! Span-based tracing on top of the OpenTelemetry SDK.
//!
//! [`Tracer`] owns an `SdkTracerProvider` and carries the current span in the
//! OpenTelemetry [`Context`](opentelemetry::Context) attached to each future.
//! Exporters implement the SDK's [`SpanExporter`] trait.

pub mod azure_monitor;
pub mod export;
pub mod span;
pub mod tracer;

pub use azure_monitor::{AzureMonitorExporter, ConnectionString};
pub use export::ConsoleSpanExporter;
pub use opentelemetry::trace::{SpanKind, Status};
pub use opentelemetry_sdk::trace::{BatchConfig, BatchConfigBuilder, SpanData, SpanExporter};
pub use span::{AttributeValue, SpanHandle};
pub use tracer::{current_span, SpanGuard, Tracer, TracerBuilder, TracerConfig};

/// GenAI semantic-convention attribute names.
pub mod attrs {
    pub const OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const SYSTEM: &str = "gen_ai.system";
    pub const REQUEST_MODEL: &str = "gen_ai.request.model";
    pub const REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";
    pub const REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";
    pub const REQUEST_TOP_P: &str = "gen_ai.request.top_p";
    pub const RESPONSE_ID: &str = "gen_ai.response.id";
    pub const RESPONSE_MODEL: &str = "gen_ai.response.model";
    pub const RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";
    pub const USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
    pub const USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
    pub const TOOL_NAME: &str = "gen_ai.tool.name";
    pub const TOOL_CALL_ID: &str = "gen_ai.tool.call.id";
    pub const TOOL_CALL_ARGUMENTS: &str = "gen_ai.tool.call.arguments";
    pub const TOOL_CALL_RESULT: &str = "gen_ai.tool.call.result";
    pub const SERVER_ADDRESS: &str = "server.address";

    /// Event carrying a request message when content recording is on.
    pub const EVENT_PROMPT: &str = "gen_ai.content.prompt";
    /// Event carrying the response message when content recording is on.
    pub const EVENT_COMPLETION: &str = "gen_ai.content.completion";
}
