//! Append-only conversation history.

use serde::{Deserialize, Serialize};

use super::message::{ModelMessage, Role};

/// Ordered message history replayed to the service on every request.
///
/// Messages can only be appended; order is chronological turn order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system prompt and a user message.
    pub fn with_prompt(system: impl Into<String>, user: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(ModelMessage::system(system));
        conversation.push(ModelMessage::user(user));
        conversation
    }

    /// Append a message.
    pub fn push(&mut self, message: ModelMessage) {
        self.messages.push(message);
    }

    /// Add a user message.
    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.push(ModelMessage::user(text));
    }

    /// Get all messages.
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Number of messages with the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelMessage> {
        self.messages.iter()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<ModelMessage> {
        self.messages
    }
}

impl From<Vec<ModelMessage>> for Conversation {
    fn from(messages: Vec<ModelMessage>) -> Self {
        Self { messages }
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a ModelMessage;
    type IntoIter = std::slice::Iter<'a, ModelMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
