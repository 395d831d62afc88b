//! Tests for span export and the instrumented client.

mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use opentelemetry::{Array, Value};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanExporter as _};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{attr, finished_spans, memory_tracer, span_named, MockClient};
use tooltrace::provider::{ChatCompletionsClient, CompletionRequest, InstrumentedClient};
use tooltrace::telemetry::{
    attrs, current_span, AzureMonitorExporter, BatchConfigBuilder, ConsoleSpanExporter, SpanKind,
    Status, Tracer,
};
use tooltrace::types::{Conversation, GenerationSettings};

fn chat_request() -> CompletionRequest {
    CompletionRequest {
        messages: Conversation::with_prompt("You are a helpful assistant.", "Hi there").into_messages(),
        tools: vec![],
        settings: GenerationSettings::builder().max_tokens(1000).temperature(0.2).build(),
    }
}

#[tokio::test]
async fn chat_span_carries_genai_attributes() {
    let (tracer, exporter) = memory_tracer();
    let mock = Arc::new(MockClient::new("gpt-4o"));
    mock.queue_text("Hello!");
    let client = InstrumentedClient::new(mock.clone(), tracer.clone());

    client.complete(&chat_request()).await.unwrap();

    let span = span_named(&exporter, "chat gpt-4o").unwrap();
    assert_eq!(span.span_kind, SpanKind::Client);
    assert_eq!(attr(&span, attrs::OPERATION_NAME), Some("chat".into()));
    assert_eq!(attr(&span, attrs::SYSTEM), Some("mock".into()));
    assert_eq!(attr(&span, attrs::REQUEST_MODEL), Some("gpt-4o".into()));
    assert_eq!(attr(&span, attrs::REQUEST_MAX_TOKENS), Some(Value::I64(1000)));
    assert_eq!(attr(&span, attrs::REQUEST_TEMPERATURE), Some(Value::F64(0.2)));
    assert_eq!(attr(&span, attrs::SERVER_ADDRESS), Some("mock.example.com".into()));
    assert_eq!(attr(&span, attrs::RESPONSE_ID), Some("cmpl-0".into()));
    assert_eq!(
        attr(&span, attrs::RESPONSE_FINISH_REASONS),
        Some(Value::Array(Array::String(vec!["stop".into()])))
    );
    assert_eq!(attr(&span, attrs::USAGE_INPUT_TOKENS), Some(Value::I64(10)));
    assert_eq!(attr(&span, attrs::USAGE_OUTPUT_TOKENS), Some(Value::I64(20)));
}

#[tokio::test]
async fn content_is_not_recorded_by_default() {
    let (tracer, exporter) = memory_tracer();
    let mock = Arc::new(MockClient::new("gpt-4o"));
    mock.queue_text("Hello!");

    InstrumentedClient::new(mock, tracer.clone())
        .complete(&chat_request())
        .await
        .unwrap();

    let span = span_named(&exporter, "chat gpt-4o").unwrap();
    assert!(span.events.events.is_empty());
}

#[tokio::test]
async fn content_recording_adds_prompt_and_completion_events() {
    let (tracer, exporter) = memory_tracer();
    tracer.set_record_content(true);
    let mock = Arc::new(MockClient::new("gpt-4o"));
    mock.queue_text("Hello!");

    InstrumentedClient::new(mock, tracer.clone())
        .complete(&chat_request())
        .await
        .unwrap();

    let span = span_named(&exporter, "chat gpt-4o").unwrap();
    let names: Vec<_> = span.events.events.iter().map(|e| e.name.as_ref()).collect();
    assert_eq!(names, vec![attrs::EVENT_PROMPT, attrs::EVENT_PROMPT, attrs::EVENT_COMPLETION]);
    let completion = span.events.events.last().unwrap();
    let content = completion
        .attributes
        .iter()
        .find(|kv| kv.key.as_str() == "content")
        .map(|kv| kv.value.clone());
    assert_eq!(content, Some("Hello!".into()));
}

#[tokio::test]
async fn failed_completion_marks_span_error() {
    let (tracer, exporter) = memory_tracer();
    let mock = Arc::new(MockClient::new("gpt-4o"));
    mock.queue_error(tooltrace::error::TooltraceError::api(500, "boom"));

    let result = InstrumentedClient::new(mock, tracer.clone())
        .complete(&chat_request())
        .await;

    assert!(result.is_err());
    let span = span_named(&exporter, "chat gpt-4o").unwrap();
    assert!(matches!(span.status, Status::Error { .. }));
    assert!(attr(&span, "error.message").is_some());
}

#[tokio::test]
async fn current_span_reaches_instrumented_function() {
    let (tracer, exporter) = memory_tracer();
    let lookup = tracer.instrument_fn("lookup", |city: String| async move {
        current_span().set_attribute("requested_city", city.as_str());
        city.len()
    });

    assert_eq!(lookup("Seattle".to_string()).await, 7);

    let span = span_named(&exporter, "lookup").unwrap();
    assert_eq!(attr(&span, "requested_city"), Some("Seattle".into()));
}

#[tokio::test]
async fn batch_exporter_holds_spans_until_flush() {
    let exporter = InMemorySpanExporter::default();
    let tracer = Tracer::builder()
        .with_batch_exporter(
            exporter.clone(),
            BatchConfigBuilder::default()
                .with_scheduled_delay(Duration::from_secs(3600))
                .build(),
        )
        .build();

    for name in ["a", "b", "c"] {
        tracer.in_span(name, |_span| async {}).await;
    }
    assert!(finished_spans(&exporter).is_empty());

    tracer.force_flush().await;

    let names: Vec<_> = finished_spans(&exporter)
        .into_iter()
        .map(|s| s.name.to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    tracer.shutdown().await;
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn console_exporter_writes_json_per_span() {
    let buffer = SharedBuffer::default();
    let tracer = Tracer::builder()
        .with_simple_exporter(ConsoleSpanExporter::with_writer(buffer.clone()))
        .build();

    tracer
        .in_span("get_chat_response", |span| async move {
            span.set_attribute("model", "gpt-4o");
        })
        .await;

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
    assert_eq!(parsed["name"], "get_chat_response");
    assert_eq!(parsed["attributes"]["model"], "gpt-4o");
    assert!(parsed["parent_span_id"].is_null());
}

#[tokio::test]
async fn azure_monitor_exporter_posts_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2.1/track"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "itemsReceived": 2, "itemsAccepted": 2, "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exporter = AzureMonitorExporter::from_connection_string(
        &format!("InstrumentationKey=ikey;IngestionEndpoint={}/", server.uri()),
        "tooltrace",
    )
    .unwrap();
    let (tracer, memory) = memory_tracer();
    tracer
        .in_span("dispatch_loop", |_| {
            let tracer = tracer.clone();
            async move { tracer.in_span("execute_tool get_weather", |_| async {}).await }
        })
        .await;

    exporter.export(finished_spans(&memory)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["iKey"], "ikey");
    assert_eq!(body[0]["data"]["baseData"]["name"], "execute_tool get_weather");
    assert_eq!(body[0]["tags"]["ai.operation.id"], body[1]["tags"]["ai.operation.id"]);
    assert_eq!(body[0]["tags"]["ai.operation.parentId"], body[1]["data"]["baseData"]["id"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_telemetry_backend_does_not_fail_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let exporter = AzureMonitorExporter::from_connection_string(
        &format!("InstrumentationKey=ikey;IngestionEndpoint={}", server.uri()),
        "tooltrace",
    )
    .unwrap();
    assert!(exporter.export(vec![]).await.is_err());

    let tracer = Tracer::builder()
        .with_batch_exporter(exporter, BatchConfigBuilder::default().build())
        .build();
    let value = tracer.in_span("work", |_| async { 42 }).await;
    tracer.force_flush().await;
    tracer.shutdown().await;

    assert_eq!(value, 42);
    assert!(!server.received_requests().await.unwrap().is_empty());
}
