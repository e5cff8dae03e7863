use crate::chat::{ChatMessage, ChatTurn, Role};
use serde::Serialize;

/// Ordered question/answer turns for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<ChatTurn>,
}

impl ConversationHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an answered question.
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// Turns in chronological order.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of answered questions.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True before the first answer.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Flatten into alternating user/assistant messages for rendering.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|turn| {
                [
                    ChatMessage::new(Role::User, turn.question.clone()),
                    ChatMessage::new(Role::Assistant, turn.answer.clone()),
                ]
            })
            .collect()
    }
}
