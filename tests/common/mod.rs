//! Shared test helpers and mock completion client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use tooltrace::error::TooltraceError;
use tooltrace::provider::{ChatCompletionsClient, CompletionRequest, CompletionResult};
use opentelemetry::Value;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData};
use tooltrace::telemetry::Tracer;
use tooltrace::types::*;

/// A mock client that returns queued results and records every request.
pub struct MockClient {
    model: String,
    responses: Mutex<VecDeque<Result<CompletionResult, TooltraceError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockClient {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a final text answer.
    pub fn queue_text(&self, text: &str) -> &Self {
        self.push(Ok(CompletionResult {
            id: Some(format!("cmpl-{}", self.queued())),
            model: Some(self.model.clone()),
            finish_reason: FinishReason::Stop,
            message: ModelMessage::assistant(text),
            tool_calls: vec![],
            usage: usage(10, 20),
        }))
    }

    /// Queue a response requesting tool calls: `(id, name, arguments)`.
    pub fn queue_tool_calls(&self, calls: &[(&str, &str, &str)]) -> &Self {
        let tool_calls: Vec<ToolCall> = calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect();
        self.push(Ok(CompletionResult {
            id: Some(format!("cmpl-{}", self.queued())),
            model: Some(self.model.clone()),
            finish_reason: FinishReason::ToolCalls,
            message: ModelMessage::assistant_tool_calls("", tool_calls.clone()),
            tool_calls,
            usage: usage(10, 5),
        }))
    }

    /// Queue a single tool call request.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) -> &Self {
        let args = args.to_string();
        self.queue_tool_calls(&[(id, name, args.as_str())])
    }

    /// Queue a fully specified result.
    pub fn queue_result(&self, result: CompletionResult) -> &Self {
        self.push(Ok(result))
    }

    pub fn queue_error(&self, error: TooltraceError) -> &Self {
        self.push(Err(error))
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn queued(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    fn push(&self, response: Result<CompletionResult, TooltraceError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }
}

#[async_trait]
impl ChatCompletionsClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn endpoint(&self) -> Option<&str> {
        Some("https://mock.example.com/models")
    }

    fn default_model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, TooltraceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TooltraceError::api(500, "mock client has no queued response")))
    }
}

fn usage(input: u32, output: u32) -> Usage {
    Usage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
    }
}

/// Tracer exporting each span into memory as it ends.
pub fn memory_tracer() -> (Tracer, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let tracer = Tracer::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (tracer, exporter)
}

/// Finished spans in end order.
pub fn finished_spans(exporter: &InMemorySpanExporter) -> Vec<SpanData> {
    exporter.get_finished_spans().expect("in-memory exporter readable")
}

/// The first finished span with `name`.
pub fn span_named(exporter: &InMemorySpanExporter, name: &str) -> Option<SpanData> {
    finished_spans(exporter).into_iter().find(|s| s.name == name)
}

/// Value of attribute `key` on `span`.
pub fn attr(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}
