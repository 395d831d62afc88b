//! Tool-dispatch loop: query the model, run requested tools, repeat.
//!
//! Each round sends the whole conversation plus every registered tool
//! declaration. When the model asks for tools, every call is answered with
//! exactly one tool-result message (errors included) before the next request
//! goes out. The loop ends at the first non-tool answer or at the round cap.
//! Calls left over at either point are answered with error results too.

mod outcome;

pub use outcome::{DispatchOutcome, Termination, ToolInvocation};

use std::sync::Arc;

use bon::Builder;
use tracing::{debug, warn};

use crate::config::{TooltraceConfig, DEFAULT_MAX_ROUNDS};
use crate::error::{Result, TooltraceError};
use crate::provider::{ChatCompletionsClient, CompletionRequest};
use crate::telemetry::{attrs, SpanHandle, Tracer};
use crate::tools::{ToolExecutionContext, ToolRegistry};
use crate::types::{Conversation, FinishReason, GenerationSettings, ModelMessage, ToolCall, Usage};

/// Limits and settings for one dispatch run.
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct DispatchPolicy {
    /// Maximum number of completion requests per run.
    #[builder(default = DEFAULT_MAX_ROUNDS)]
    pub max_rounds: u32,
    #[builder(default)]
    pub settings: GenerationSettings,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DispatchPolicy {
    /// Policy using the configured round cap and model.
    pub fn from_config(config: &TooltraceConfig) -> Self {
        Self {
            max_rounds: config.max_rounds(),
            settings: GenerationSettings {
                model: config.model.clone(),
                ..Default::default()
            },
        }
    }
}

enum LoopState {
    AwaitingCompletion,
    DispatchingTools(Vec<ToolCall>),
    Done {
        text: String,
        finish_reason: FinishReason,
        termination: Termination,
    },
}

/// Drives a conversation to a final answer, dispatching tool calls.
pub struct DispatchLoop<C> {
    client: C,
    registry: Arc<ToolRegistry>,
    tracer: Tracer,
    policy: DispatchPolicy,
}

impl<C: ChatCompletionsClient> DispatchLoop<C> {
    pub fn new(client: C, registry: impl Into<Arc<ToolRegistry>>, tracer: Tracer) -> Self {
        Self {
            client,
            registry: registry.into(),
            tracer,
            policy: DispatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.policy.max_rounds = max_rounds;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Run a fresh conversation made of a system and a user message.
    pub async fn run_prompt(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<DispatchOutcome> {
        self.run(Conversation::with_prompt(system, user)).await
    }

    /// Run until the model answers without tool calls or the round cap is hit.
    ///
    /// Tool failures are folded into the conversation. Completion-client
    /// failures end the run and are returned as-is.
    pub async fn run(&self, conversation: Conversation) -> Result<DispatchOutcome> {
        if self.policy.max_rounds == 0 {
            return Err(TooltraceError::InvalidArgument(
                "max_rounds must be at least 1".into(),
            ));
        }
        self.tracer
            .in_span_result("dispatch_loop", |span| self.drive(span, conversation))
            .await
    }

    async fn drive(&self, span: SpanHandle, mut conversation: Conversation) -> Result<DispatchOutcome> {
        let declarations = self.registry.declarations();
        let mut state = LoopState::AwaitingCompletion;
        let mut rounds = 0u32;
        let mut usage = Usage::default();
        let mut invocations = Vec::new();

        let (text, finish_reason, termination) = loop {
            state = match state {
                LoopState::AwaitingCompletion => {
                    rounds += 1;
                    debug!(round = rounds, messages = conversation.len(), "requesting completion");
                    let request = CompletionRequest {
                        messages: conversation.messages().to_vec(),
                        tools: declarations.clone(),
                        settings: self.policy.settings.clone(),
                    };
                    let result = self.client.complete(&request).await?;
                    usage.merge(&result.usage);

                    if !result.wants_tools() {
                        let text = result.text();
                        conversation.push(result.message);
                        if !result.tool_calls.is_empty() {
                            warn!(
                                finish_reason = %result.finish_reason,
                                calls = result.tool_calls.len(),
                                "terminal response carried tool calls; answering them unexecuted"
                            );
                            answer_unexecuted(
                                &mut conversation,
                                &result.tool_calls,
                                &format!(
                                    "response finished with '{}'; tool call was not executed",
                                    result.finish_reason
                                ),
                            );
                        }
                        LoopState::Done {
                            text,
                            finish_reason: result.finish_reason,
                            termination: Termination::Completed,
                        }
                    } else if rounds >= self.policy.max_rounds {
                        warn!(
                            max_rounds = self.policy.max_rounds,
                            pending = result.tool_calls.len(),
                            "round limit reached with tool calls outstanding"
                        );
                        let text = result.text();
                        conversation.push(result.message);
                        answer_unexecuted(
                            &mut conversation,
                            &result.tool_calls,
                            &format!(
                                "round limit of {} reached; tool call was not executed",
                                self.policy.max_rounds
                            ),
                        );
                        LoopState::Done {
                            text,
                            finish_reason: result.finish_reason,
                            termination: Termination::RoundLimitReached,
                        }
                    } else {
                        conversation.push(result.message);
                        LoopState::DispatchingTools(result.tool_calls)
                    }
                }
                LoopState::DispatchingTools(calls) => {
                    for call in &calls {
                        let invocation = self.dispatch_call(call, rounds).await;
                        conversation.push(ModelMessage::tool_result(
                            &call.id,
                            invocation.content.clone(),
                            invocation.is_error,
                        ));
                        invocations.push(invocation);
                    }
                    LoopState::AwaitingCompletion
                }
                LoopState::Done {
                    text,
                    finish_reason,
                    termination,
                } => break (text, finish_reason, termination),
            };
        };

        span.set_attribute("dispatch.rounds", rounds);
        span.set_attribute("dispatch.tool_invocations", invocations.len());
        span.set_attribute("dispatch.termination", termination.to_string());
        span.set_attribute(attrs::USAGE_INPUT_TOKENS, usage.input_tokens);
        span.set_attribute(attrs::USAGE_OUTPUT_TOKENS, usage.output_tokens);

        Ok(DispatchOutcome {
            text,
            finish_reason,
            termination,
            rounds,
            invocations,
            usage,
            conversation,
        })
    }

    /// Run one tool call inside an `execute_tool {name}` span.
    async fn dispatch_call(&self, call: &ToolCall, round: u32) -> ToolInvocation {
        let record_content = self.tracer.record_content();
        self.tracer
            .in_span(format!("execute_tool {}", call.name), |span| async move {
                span.set_attribute(attrs::OPERATION_NAME, "execute_tool");
                span.set_attribute(attrs::TOOL_NAME, call.name.as_str());
                span.set_attribute(attrs::TOOL_CALL_ID, call.id.as_str());
                if record_content {
                    span.set_attribute(attrs::TOOL_CALL_ARGUMENTS, call.arguments.as_str());
                }

                let ctx = ToolExecutionContext::for_call(call, span.clone());
                let (content, is_error) =
                    match self.registry.invoke(&call.name, &call.arguments, &ctx).await {
                        Ok(text) => {
                            debug!(tool = %call.name, call_id = %call.id, "tool call succeeded");
                            (text, false)
                        }
                        Err(e) => {
                            warn!(tool = %call.name, call_id = %call.id, error = %e, "tool call failed");
                            span.record_error(&e);
                            (error_payload(&e.to_string()), true)
                        }
                    };
                if record_content {
                    span.set_attribute(attrs::TOOL_CALL_RESULT, content.as_str());
                }

                ToolInvocation {
                    round,
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    content,
                    is_error,
                }
            })
            .await
    }
}

/// Answer every call with an error result so the conversation stays valid
/// for a follow-up request.
fn answer_unexecuted(conversation: &mut Conversation, calls: &[ToolCall], reason: &str) {
    for call in calls {
        conversation.push(ModelMessage::tool_result(&call.id, error_payload(reason), true));
    }
}

/// Text sent back to the model for a failed tool call.
fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
