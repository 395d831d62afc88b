//! Error types for tooltrace.

pub mod unified;

pub use unified::{ErrorCategory, ErrorDetails};

use thiserror::Error;

/// Primary error type for all tooltrace operations.
#[derive(Error, Debug)]
pub enum TooltraceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<ErrorDetails>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments for tool {tool_name}: {message}")]
    ToolArgument { tool_name: String, message: String },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl TooltraceError {
    /// Create an API error without details.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error with the parsed service error body.
    pub fn api_with_details(status: u16, message: impl Into<String>, details: ErrorDetails) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::ToolNotFound(_)
            | Self::ToolArgument { .. }
            | Self::ToolExecution { .. }
            | Self::DuplicateTool(_) => ErrorCategory::Tool,
            Self::Telemetry(_) => ErrorCategory::Telemetry,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is a tool-level failure the dispatch loop absorbs
    /// into the conversation.
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound(_) | Self::ToolArgument { .. } | Self::ToolExecution { .. }
        )
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TooltraceError>;
