//! Retrieval-augmented conversation over a session's vector index.

mod history;
mod pipeline;
mod prompts;

pub use history::ConversationHistory;
pub use pipeline::{ConversationalPipeline, PipelineSettings};

use crate::chat::ChatClientError;
use crate::embedding::EmbeddingClientError;
use crate::index::IndexError;
use thiserror::Error;

/// Guidance shown when a question arrives before any documents were processed.
pub const NOT_READY_MESSAGE: &str = "Please upload and process your PDFs first.";

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// No vector index exists for the session yet.
    #[error("{}", NOT_READY_MESSAGE)]
    NotReady,
    /// The question was blank.
    #[error("Please enter a question.")]
    EmptyQuestion,
    /// Embedding the question failed.
    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Retrieval against the index failed.
    #[error("Failed to search documents: {0}")]
    Retrieval(#[from] IndexError),
    /// The chat model call failed.
    #[error("Chat model request failed: {0}")]
    Chat(#[from] ChatClientError),
}

impl ConversationError {
    /// User-facing guidance for input and precondition errors; `None` for service failures.
    pub fn guidance(&self) -> Option<String> {
        match self {
            Self::NotReady | Self::EmptyQuestion => Some(self.to_string()),
            Self::Embedding(_) | Self::Retrieval(_) | Self::Chat(_) => None,
        }
    }
}
