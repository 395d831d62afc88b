use serde::Serialize;
use strum::Display;

use crate::types::{Conversation, FinishReason, Usage};

/// Why a dispatch run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Termination {
    /// The model answered without requesting tools.
    Completed,
    /// The last allowed request still asked for tools.
    RoundLimitReached,
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    /// 1-based round in which the call was requested.
    pub round: u32,
    pub tool_call_id: String,
    pub tool_name: String,
    pub arguments: String,
    /// Text folded back into the conversation.
    pub content: String,
    pub is_error: bool,
}

/// Result of a dispatch run.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    /// Text of the last assistant message.
    pub text: String,
    pub finish_reason: FinishReason,
    pub termination: Termination,
    /// Completion requests sent.
    pub rounds: u32,
    pub invocations: Vec<ToolInvocation>,
    pub usage: Usage,
    pub conversation: Conversation,
}

impl DispatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }

    pub fn failed_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.invocations.iter().filter(|i| i.is_error)
    }
}
