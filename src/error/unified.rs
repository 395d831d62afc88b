//! Error classification and service error bodies.

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Tool,
    Telemetry,
    Unknown,
}

/// Structured error body returned by the inference service.
///
/// Azure AI Inference answers failures with
/// `{"error": {"code": "...", "message": "...", "param": "..."}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetails {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}

impl ErrorDetails {
    /// Parse the `error` object out of a response body, if there is one.
    pub fn from_body(body: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            error: ErrorDetails,
        }
        serde_json::from_str::<Envelope>(body).ok().map(|e| e.error)
    }
}
