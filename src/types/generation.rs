//! Generation settings and related enums.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Settings controlling a completion request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSettings {
    /// Model or deployment name. Endpoints bound to a single deployment
    /// accept requests without it.
    #[builder(into)]
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub seed: Option<u64>,
    pub stop_sequences: Option<Vec<String>>,
}

/// Why generation finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    /// Any value the service sends that we do not model. Treated as terminal.
    #[serde(other)]
    Unknown,
}

impl FinishReason {
    /// Parse a wire value, mapping anything unrecognized to `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or(FinishReason::Unknown)
    }

    /// Whether this reason asks the caller to run tools.
    pub fn requests_tools(&self) -> bool {
        matches!(self, FinishReason::ToolCalls)
    }
}
