//! Decorator that wraps completion calls in GenAI-convention spans.

use async_trait::async_trait;

use super::{ChatCompletionsClient, CompletionRequest, CompletionResult};
use crate::error::Result;
use crate::telemetry::{attrs, AttributeValue, SpanHandle, SpanKind, Tracer};
use crate::types::{ModelMessage, Role};

const OPERATION: &str = "chat";

/// Wraps any [`ChatCompletionsClient`] so each call produces a client-kind
/// `chat {model}` span.
///
/// Message text and tool arguments are attached as span events only when the
/// tracer records content.
#[derive(Debug, Clone)]
pub struct InstrumentedClient<C> {
    inner: C,
    tracer: Tracer,
}

impl<C: ChatCompletionsClient> InstrumentedClient<C> {
    pub fn new(inner: C, tracer: Tracer) -> Self {
        Self { inner, tracer }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    fn request_model<'a>(&'a self, request: &'a CompletionRequest) -> Option<&'a str> {
        request
            .settings
            .model
            .as_deref()
            .or_else(|| self.inner.default_model())
    }

    fn record_request(&self, span: &SpanHandle, request: &CompletionRequest) {
        span.set_attribute(attrs::OPERATION_NAME, OPERATION);
        span.set_attribute(attrs::SYSTEM, self.inner.provider_name());
        if let Some(model) = self.request_model(request) {
            span.set_attribute(attrs::REQUEST_MODEL, model);
        }
        if let Some(address) = self.inner.endpoint().and_then(server_address) {
            span.set_attribute(attrs::SERVER_ADDRESS, address);
        }
        let settings = &request.settings;
        if let Some(max) = settings.max_tokens {
            span.set_attribute(attrs::REQUEST_MAX_TOKENS, max);
        }
        if let Some(temperature) = settings.temperature {
            span.set_attribute(attrs::REQUEST_TEMPERATURE, temperature);
        }
        if let Some(top_p) = settings.top_p {
            span.set_attribute(attrs::REQUEST_TOP_P, top_p);
        }

        if self.tracer.record_content() {
            for message in &request.messages {
                span.add_event(attrs::EVENT_PROMPT, message_fields(message));
            }
        }
    }

    fn record_response(&self, span: &SpanHandle, result: &CompletionResult) {
        if let Some(id) = &result.id {
            span.set_attribute(attrs::RESPONSE_ID, id.as_str());
        }
        if let Some(model) = &result.model {
            span.set_attribute(attrs::RESPONSE_MODEL, model.as_str());
        }
        span.set_attribute(
            attrs::RESPONSE_FINISH_REASONS,
            vec![result.finish_reason.to_string()],
        );
        span.set_attribute(attrs::USAGE_INPUT_TOKENS, result.usage.input_tokens);
        span.set_attribute(attrs::USAGE_OUTPUT_TOKENS, result.usage.output_tokens);

        if self.tracer.record_content() {
            let mut fields = message_fields(&result.message);
            fields.push((
                "finish_reason".to_string(),
                result.finish_reason.to_string().into(),
            ));
            span.add_event(attrs::EVENT_COMPLETION, fields);
        }
    }
}

#[async_trait]
impl<C: ChatCompletionsClient> ChatCompletionsClient for InstrumentedClient<C> {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn endpoint(&self) -> Option<&str> {
        self.inner.endpoint()
    }

    fn default_model(&self) -> Option<&str> {
        self.inner.default_model()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult> {
        let name = match self.request_model(request) {
            Some(model) => format!("{OPERATION} {model}"),
            None => OPERATION.to_string(),
        };
        self.tracer
            .in_span_result_with_kind(name, SpanKind::Client, |span| async move {
                self.record_request(&span, request);
                let result = self.inner.complete(request).await?;
                self.record_response(&span, &result);
                Ok(result)
            })
            .await
    }
}

/// Host part of an endpoint URL.
fn server_address(endpoint: &str) -> Option<String> {
    reqwest::Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
}

fn message_fields(message: &ModelMessage) -> Vec<(String, AttributeValue)> {
    let mut fields = vec![("role".to_string(), message.role.as_str().into())];
    let text = message.text();
    if !text.is_empty() {
        fields.push(("content".to_string(), text.into()));
    }
    match message.role {
        Role::Assistant => {
            for call in message.tool_calls() {
                fields.push((
                    format!("tool_calls.{}", call.id),
                    format!("{}({})", call.name, call.arguments).into(),
                ));
            }
        }
        Role::Tool => {
            if let Some(result) = message.tool_result_part() {
                fields.push(("id".to_string(), result.tool_call_id.as_str().into()));
                fields.push(("content".to_string(), result.content.as_str().into()));
            }
        }
        _ => {}
    }
    fields
}
