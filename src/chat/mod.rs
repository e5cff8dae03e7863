//! Chat-model abstraction and the Azure OpenAI chat-completions adapter.
//!
//! The conversation pipeline never builds provider payloads itself: it hands a [`ChatPrompt`]
//! and the running history to a [`ChatModel`], which turns them into whatever wire format the
//! provider expects.

use crate::azure::{AzureError, AzureTransport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced while requesting a chat completion.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Transport or service-level failure.
    #[error(transparent)]
    Azure(#[from] AzureError),
    /// Provider response could not be parsed or carried no answer.
    #[error("Malformed chat response: {0}")]
    InvalidResponse(String),
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and retrieved context.
    System,
    /// The human asking questions.
    User,
    /// The model's replies.
    Assistant,
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Convenience constructor.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Question as typed by the user.
    pub question: String,
    /// Answer returned by the chat model.
    pub answer: String,
}

/// Prompt for a single completion: optional system instructions plus the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    /// System instructions, typically carrying retrieved context.
    pub system: Option<String>,
    /// The user message to answer.
    pub user: String,
}

impl ChatPrompt {
    /// Flatten the prompt and history into the ordered message list sent to providers.
    ///
    /// Order: system message (if any), history as alternating user/assistant messages, then the
    /// new user message.
    pub fn to_messages(&self, history: &[ChatTurn]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage::new(Role::System, system.clone()));
        }
        for turn in history {
            messages.push(ChatMessage::new(Role::User, turn.question.clone()));
            messages.push(ChatMessage::new(Role::Assistant, turn.answer.clone()));
        }
        messages.push(ChatMessage::new(Role::User, self.user.clone()));
        messages
    }
}

/// Interface implemented by hosted chat models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate an answer for `prompt`, conditioned on the prior conversation.
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        history: &[ChatTurn],
    ) -> Result<String, ChatClientError>;
}

/// Azure OpenAI chat-completions adapter.
pub struct AzureChatClient {
    transport: AzureTransport,
    deployment: String,
    temperature: Option<f32>,
}

impl AzureChatClient {
    /// Construct a client for a chat deployment.
    pub fn new(
        transport: AzureTransport,
        deployment: impl Into<String>,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            transport,
            deployment: deployment.into(),
            temperature,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for AzureChatClient {
    async fn complete(
        &self,
        prompt: &ChatPrompt,
        history: &[ChatTurn],
    ) -> Result<String, ChatClientError> {
        let messages = prompt.to_messages(history);
        tracing::debug!(
            deployment = %self.deployment,
            messages = messages.len(),
            "Requesting chat completion"
        );

        let request = CompletionRequest {
            messages: &messages,
            temperature: self.temperature,
        };
        let response = self
            .transport
            .post_json(&self.deployment, "chat/completions", &request)
            .await?;
        let body: CompletionResponse = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!("failed to decode chat response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ChatClientError::InvalidResponse("response carried no answer".into()))
    }
}
