//! Console span exporter.

use std::future::Future;
use std::io::Write;
use std::sync::Mutex;

use opentelemetry::trace::Status;
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use serde_json::json;

use super::span::{attributes_to_json, to_utc};

/// Writes each span as a pretty-printed JSON document.
pub struct ConsoleSpanExporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSpanExporter {
    /// Export to standard output.
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_batch(&self, batch: &[SpanData]) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for span in batch {
            let rendered = serde_json::to_string_pretty(&render(span))?;
            writeln!(writer, "{rendered}")?;
        }
        writer.flush()
    }
}

impl std::fmt::Debug for ConsoleSpanExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConsoleSpanExporter")
    }
}

impl SpanExporter for ConsoleSpanExporter {
    fn export(&self, batch: Vec<SpanData>) -> impl Future<Output = OTelSdkResult> + Send {
        let result = self
            .write_batch(&batch)
            .map_err(|e| OTelSdkError::InternalFailure(format!("console export failed: {e}")));
        std::future::ready(result)
    }
}

/// JSON document for one finished span.
pub(crate) fn render(span: &SpanData) -> serde_json::Value {
    let start = to_utc(span.start_time);
    let end = to_utc(span.end_time);
    let parent = (span.parent_span_id != opentelemetry::trace::SpanId::INVALID)
        .then(|| span.parent_span_id.to_string());
    let events: Vec<_> = span
        .events
        .events
        .iter()
        .map(|event| {
            json!({
                "name": event.name.as_ref(),
                "timestamp": to_utc(event.timestamp).to_rfc3339(),
                "attributes": attributes_to_json(&event.attributes),
            })
        })
        .collect();

    json!({
        "name": span.name.as_ref(),
        "context": {
            "trace_id": span.span_context.trace_id().to_string(),
            "span_id": span.span_context.span_id().to_string(),
        },
        "parent_span_id": parent,
        "kind": format!("{:?}", span.span_kind),
        "start_time": start.to_rfc3339(),
        "end_time": end.to_rfc3339(),
        "duration_ms": (end - start).num_milliseconds(),
        "attributes": attributes_to_json(&span.attributes),
        "status": status_json(&span.status),
        "events": events,
    })
}

fn status_json(status: &Status) -> serde_json::Value {
    match status {
        Status::Error { description } => json!({ "code": "error", "description": description.as_ref() }),
        Status::Ok => json!({ "code": "ok" }),
        _ => json!({ "code": "unset" }),
    }
}
