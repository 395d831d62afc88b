//! Handle used to annotate the open span, and attribute conversions.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use opentelemetry::trace::{SpanContext, Status, TraceContextExt};
use opentelemetry::{Array, Context, KeyValue, Value};
use serde_json::json;

/// Attribute value accepted by [`SpanHandle`].
///
/// Wraps an OpenTelemetry [`Value`] so borrowed strings and unsigned counts
/// convert without ceremony at call sites.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue(Value);

impl AttributeValue {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AttributeValue> for Value {
    fn from(v: AttributeValue) -> Self {
        v.0
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self(Value::from(v.to_string()))
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self(Value::from(v))
    }
}

impl From<&String> for AttributeValue {
    fn from(v: &String) -> Self {
        Self(Value::from(v.clone()))
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self(Value::Bool(v))
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self(Value::I64(v))
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        Self(Value::I64(i64::from(v)))
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        Self(Value::I64(i64::try_from(v).unwrap_or(i64::MAX)))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self(Value::F64(v))
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        Self(Value::Array(Array::String(
            v.into_iter().map(Into::into).collect(),
        )))
    }
}

/// Clonable handle to an open span.
///
/// Holds the [`Context`] the span lives in. A default handle is a no-op, and
/// writes after the span has ended are dropped by the SDK.
#[derive(Clone, Default)]
pub struct SpanHandle {
    cx: Option<Context>,
}

impl fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span_context() {
            Some(sc) => f
                .debug_struct("SpanHandle")
                .field("trace_id", &sc.trace_id().to_string())
                .field("span_id", &sc.span_id().to_string())
                .finish(),
            None => f.write_str("SpanHandle(noop)"),
        }
    }
}

impl SpanHandle {
    /// A handle that records nothing.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Handle for the active span of `cx`, or a no-op handle when there is
    /// none.
    pub fn from_context(cx: Context) -> Self {
        if cx.has_active_span() {
            Self { cx: Some(cx) }
        } else {
            Self::noop()
        }
    }

    /// The context carrying this span, used to parent child spans.
    pub fn context(&self) -> Context {
        self.cx.clone().unwrap_or_default()
    }

    pub fn span_context(&self) -> Option<SpanContext> {
        self.cx.as_ref().map(|cx| cx.span().span_context().clone())
    }

    /// Whether writes to this handle are still recorded.
    pub fn is_recording(&self) -> bool {
        self.cx.as_ref().is_some_and(|cx| cx.span().is_recording())
    }

    /// Set (or overwrite) an attribute.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        if let Some(cx) = &self.cx {
            cx.span()
                .set_attribute(KeyValue::new(key.into(), Value::from(value.into())));
        }
    }

    /// Append a timestamped event.
    pub fn add_event(
        &self,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (String, AttributeValue)>,
    ) {
        if let Some(cx) = &self.cx {
            let attributes = attributes
                .into_iter()
                .map(|(k, v)| KeyValue::new(k, Value::from(v)))
                .collect();
            cx.span().add_event(name.into(), attributes);
        }
    }

    pub fn set_status(&self, status: Status) {
        if let Some(cx) = &self.cx {
            cx.span().set_status(status);
        }
    }

    /// Mark the span failed, with an `error.message` attribute and an
    /// `exception` event.
    pub fn record_error(&self, error: &dyn fmt::Display) {
        let Some(cx) = &self.cx else {
            return;
        };
        let description = error.to_string();
        let span = cx.span();
        span.set_attribute(KeyValue::new("error.message", description.clone()));
        span.add_event(
            "exception",
            vec![KeyValue::new("exception.message", description.clone())],
        );
        span.set_status(Status::error(description));
    }

    /// Close the span. Later calls do nothing.
    pub fn end(&self) {
        if let Some(cx) = &self.cx {
            cx.span().end();
        }
    }
}

/// JSON rendering of an attribute value.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::I64(v) => json!(v),
        Value::F64(v) => json!(v),
        Value::String(v) => json!(v.as_str()),
        Value::Array(Array::Bool(v)) => json!(v),
        Value::Array(Array::I64(v)) => json!(v),
        Value::Array(Array::F64(v)) => json!(v),
        Value::Array(Array::String(v)) => {
            json!(v.iter().map(|s| s.as_str()).collect::<Vec<_>>())
        }
        #[allow(unreachable_patterns)]
        other => json!(other.to_string()),
    }
}

/// Attributes as a JSON object keyed by attribute name.
pub(crate) fn attributes_to_json(attributes: &[KeyValue]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = attributes
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), value_to_json(&kv.value)))
        .collect();
    serde_json::Value::Object(map)
}

pub(crate) fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Tracer as _, TracerProvider as _};
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

    fn provider() -> (SdkTracerProvider, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (provider, exporter)
    }

    #[test]
    fn handle_writes_reach_exported_span() {
        let (provider, exporter) = provider();
        let span = provider.tracer("test").start("op");
        let handle = SpanHandle::from_context(Context::new().with_span(span));

        handle.set_attribute("requested_city", "Seattle");
        handle.set_attribute("rounds", 2u32);
        handle.end();
        handle.set_attribute("late", true);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        let keys: Vec<_> = spans[0].attributes.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["requested_city", "rounds"]);
        assert!(!handle.is_recording());
    }

    #[test]
    fn noop_handle_records_nothing() {
        let span = SpanHandle::noop();
        span.set_attribute("k", "v");
        span.end();
        assert!(span.span_context().is_none());
        assert!(!span.is_recording());
        assert!(SpanHandle::from_context(Context::new()).span_context().is_none());
    }

    #[test]
    fn record_error_sets_status_and_event() {
        let (provider, exporter) = provider();
        let handle =
            SpanHandle::from_context(Context::new().with_span(provider.tracer("test").start("op")));

        handle.record_error(&"boom");
        handle.end();

        let span = &exporter.get_finished_spans().unwrap()[0];
        assert_eq!(span.status, Status::error("boom"));
        assert_eq!(span.events.events[0].name, "exception");
    }

    #[test]
    fn values_render_as_plain_json() {
        assert_eq!(value_to_json(&AttributeValue::from(7u32).into()), json!(7));
        assert_eq!(
            value_to_json(&AttributeValue::from(vec!["stop".to_string()]).into()),
            json!(["stop"])
        );
        assert_eq!(value_to_json(&AttributeValue::from("x").into()), json!("x"));
    }
}
