//! Azure Monitor (Application Insights) span exporter.
//!
//! Spans are sent as `RemoteDependency` telemetry items to the ingestion
//! endpoint named in an Application Insights connection string.

use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;

use opentelemetry::trace::{SpanId, Status};
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use serde::Serialize;
use tokio::runtime::Handle;

use super::span::{to_utc, value_to_json};
use crate::error::{Result, TooltraceError};
use crate::provider::http::shared_client;

const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const TRACK_PATH: &str = "v2.1/track";

/// Parsed `InstrumentationKey=...;IngestionEndpoint=...` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    pub ingestion_endpoint: String,
}

impl FromStr for ConnectionString {
    type Err = TooltraceError;

    fn from_str(raw: &str) -> Result<Self> {
        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(TooltraceError::Configuration(format!(
                    "malformed connection string segment '{pair}'"
                )));
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.trim().to_string()),
                "ingestionendpoint" => ingestion_endpoint = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TooltraceError::Configuration(
                    "connection string is missing InstrumentationKey".into(),
                )
            })?;

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint: ingestion_endpoint
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Posts spans to Application Insights.
///
/// Requests run on the tokio runtime that was current when the exporter was
/// built, so the exporter also works from the SDK's batch export thread.
/// Register it with `TracerBuilder::with_batch_exporter`: the simple processor
/// blocks the ending thread until the request finishes.
#[derive(Debug, Clone)]
pub struct AzureMonitorExporter {
    connection: ConnectionString,
    role_name: String,
    runtime: Handle,
}

impl AzureMonitorExporter {
    /// Build an exporter. Must be called within a tokio runtime.
    pub fn new(connection: ConnectionString, role_name: impl Into<String>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| {
            TooltraceError::Configuration("Azure Monitor export needs a tokio runtime".into())
        })?;
        Ok(Self {
            connection,
            role_name: role_name.into(),
            runtime,
        })
    }

    /// Parse a connection string and build the exporter.
    pub fn from_connection_string(raw: &str, role_name: impl Into<String>) -> Result<Self> {
        Self::new(raw.parse()?, role_name)
    }

    pub fn track_url(&self) -> String {
        format!("{}/{}", self.connection.ingestion_endpoint, TRACK_PATH)
    }

    fn envelope(&self, span: &SpanData) -> Envelope {
        let mut tags = BTreeMap::new();
        tags.insert("ai.operation.id", span.span_context.trace_id().to_string());
        if span.parent_span_id != SpanId::INVALID {
            tags.insert("ai.operation.parentId", span.parent_span_id.to_string());
        }
        tags.insert("ai.cloud.role", self.role_name.clone());

        let success = !matches!(span.status, Status::Error { .. });
        let properties = span
            .attributes
            .iter()
            .map(|kv| (kv.key.as_str().to_string(), property_text(&kv.value)))
            .collect();
        let start = to_utc(span.start_time);

        Envelope {
            name: "Microsoft.ApplicationInsights.RemoteDependency",
            time: start.to_rfc3339(),
            i_key: self.connection.instrumentation_key.clone(),
            tags,
            data: EnvelopeData {
                base_type: "RemoteDependencyData",
                base_data: RemoteDependencyData {
                    ver: 2,
                    id: span.span_context.span_id().to_string(),
                    name: span.name.to_string(),
                    duration: format_duration(to_utc(span.end_time) - start),
                    result_code: if success { "0" } else { "1" },
                    success,
                    kind: "InProc",
                    properties,
                },
            },
        }
    }
}

impl SpanExporter for AzureMonitorExporter {
    fn export(&self, batch: Vec<SpanData>) -> impl Future<Output = OTelSdkResult> + Send {
        let envelopes: Vec<Envelope> = batch.iter().map(|s| self.envelope(s)).collect();
        let request = shared_client().post(self.track_url()).json(&envelopes);
        let count = envelopes.len();
        let task = self.runtime.spawn(post(request, count));

        async move {
            match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(message)) => Err(OTelSdkError::InternalFailure(message)),
                Err(e) => Err(OTelSdkError::InternalFailure(format!("export task failed: {e}"))),
            }
        }
    }
}

async fn post(request: reqwest::RequestBuilder, count: usize) -> std::result::Result<(), String> {
    let resp = request
        .send()
        .await
        .map_err(|e| format!("ingestion request failed: {e}"))?;
    let status = resp.status().as_u16();
    // 206 means some items were rejected; the rest were accepted.
    if status == 200 || status == 206 {
        tracing::debug!(spans = count, status, "exported spans to Azure Monitor");
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(format!("ingestion endpoint returned {status}: {body}"))
}

/// Plain-text property value; arrays render as JSON.
fn property_text(value: &opentelemetry::Value) -> String {
    match value {
        opentelemetry::Value::String(s) => s.as_str().to_string(),
        opentelemetry::Value::Array(_) => value_to_json(value).to_string(),
        other => other.to_string(),
    }
}

/// Application Insights timespan: `[d.]hh:mm:ss.ffffff`.
fn format_duration(duration: chrono::Duration) -> String {
    let micros = duration.num_microseconds().unwrap_or(i64::MAX).max(0);
    let total_secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}.{frac:06}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{frac:06}")
    }
}

#[derive(Serialize)]
struct Envelope {
    name: &'static str,
    time: String,
    #[serde(rename = "iKey")]
    i_key: String,
    tags: BTreeMap<&'static str, String>,
    data: EnvelopeData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData {
    base_type: &'static str,
    base_data: RemoteDependencyData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteDependencyData {
    ver: u8,
    id: String,
    name: String,
    duration: String,
    result_code: &'static str,
    success: bool,
    #[serde(rename = "type")]
    kind: &'static str,
    properties: BTreeMap<String, String>,
}
