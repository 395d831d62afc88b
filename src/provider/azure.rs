//! Azure AI Inference chat-completions client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::{InferenceCredentials, DEFAULT_API_VERSION};
use crate::error::{Result, TooltraceError};
use crate::types::{FinishReason, ModelMessage, Role, ToolCall, Usage};
use crate::util::RetryPolicy;

use super::http::{inference_headers, shared_client, status_to_error, REQUEST_TIMEOUT};
use super::{ChatCompletionsClient, CompletionRequest, CompletionResult};

const PROVIDER_NAME: &str = "az.ai.inference";

/// Client for an Azure AI Inference (or Azure OpenAI) chat endpoint.
#[derive(Debug, Clone)]
pub struct AzureInferenceClient {
    endpoint: String,
    api_key: String,
    api_version: String,
    model: Option<String>,
    retry: RetryPolicy,
}

impl AzureInferenceClient {
    /// `endpoint` is the base URL; `/chat/completions` is appended.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_credentials(credentials: &InferenceCredentials) -> Self {
        let mut client = Self::new(&credentials.endpoint, &credentials.api_key)
            .with_api_version(&credentials.api_version);
        client.model = credentials.model.clone();
        client
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Model sent when the request settings leave it unset.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions?api-version={}",
            self.endpoint, self.api_version
        )
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            request.messages.iter().map(message_to_wire).collect();

        let mut body = serde_json::Map::new();
        body.insert("messages".into(), messages.into());

        let settings = &request.settings;
        if let Some(model) = settings.model.as_deref().or(self.model.as_deref()) {
            body.insert("model".into(), model.into());
        }
        if let Some(max) = settings.max_tokens {
            body.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = settings.temperature {
            body.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = settings.top_p {
            body.insert("top_p".into(), top_p.into());
        }
        if let Some(seed) = settings.seed {
            body.insert("seed".into(), seed.into());
        }
        if let Some(ref stops) = settings.stop_sequences {
            body.insert("stop".into(), serde_json::json!(stops));
        }

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body.insert("tools".into(), tools.into());
        }

        serde_json::Value::Object(body)
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<CompletionResult> {
        let resp = shared_client()
            .post(self.completions_url())
            .headers(inference_headers(&self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TooltraceError::Timeout(REQUEST_TIMEOUT.as_millis() as u64)
                } else {
                    TooltraceError::Network(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(
                status.as_u16(),
                retry_after.as_deref(),
                &body_text,
            ));
        }

        let data: WireChatResponse = resp.json().await?;
        data.into_result()
    }
}

#[async_trait]
impl ChatCompletionsClient for AzureInferenceClient {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn endpoint(&self) -> Option<&str> {
        Some(&self.endpoint)
    }

    fn default_model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult> {
        let body = self.build_request_body(request);
        debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );
        self.retry.execute(|| self.send_once(&body)).await
    }
}

fn message_to_wire(msg: &ModelMessage) -> serde_json::Value {
    match msg.role {
        Role::Tool => {
            let (id, content) = msg
                .tool_result_part()
                .map(|tr| (tr.tool_call_id.as_str(), tr.content.clone()))
                .unwrap_or(("", msg.text()));
            serde_json::json!({
                "role": "tool",
                "tool_call_id": id,
                "content": content,
            })
        }
        Role::Assistant if !msg.tool_calls().is_empty() => {
            let calls: Vec<serde_json::Value> = msg
                .tool_calls()
                .into_iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments,
                        }
                    })
                })
                .collect();
            let text = msg.text();
            serde_json::json!({
                "role": "assistant",
                "content": if text.is_empty() { serde_json::Value::Null } else { text.into() },
                "tool_calls": calls,
            })
        }
        role => serde_json::json!({ "role": role.as_str(), "content": msg.text() }),
    }
}

// Wire response types (internal)

#[derive(Deserialize)]
struct WireChatResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl WireChatResponse {
    fn into_result(self) -> Result<CompletionResult> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TooltraceError::api(200, "no choices in completion response"))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_wire)
            .unwrap_or(FinishReason::Unknown);

        let text = choice.message.content.unwrap_or_default();
        let message = if tool_calls.is_empty() {
            ModelMessage::assistant(text)
        } else {
            ModelMessage::assistant_tool_calls(text, tool_calls.clone())
        };

        Ok(CompletionResult {
            id: self.id,
            model: self.model,
            finish_reason,
            message,
            tool_calls,
            usage: self
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                })
                .unwrap_or_default(),
        })
    }
}
