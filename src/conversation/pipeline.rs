//! Question answering: condense, embed, retrieve, prompt, complete.

use super::{ConversationError, ConversationHistory, prompts};
use crate::{
    chat::ChatModel, config::Config, embedding::Embedder, index::VectorIndex,
    metrics::PipelineMetrics,
};
use std::sync::Arc;

/// Retrieval defaults for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Rephrase follow-ups into standalone questions before retrieval.
    pub condense_follow_ups: bool,
}

impl PipelineSettings {
    /// Settings taken from `RETRIEVAL_TOP_K` and `CONDENSE_FOLLOW_UPS`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval_top_k,
            condense_follow_ups: config.condense_follow_ups,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            condense_follow_ups: true,
        }
    }
}

/// Stateless question-answering pipeline shared by every session.
///
/// Session state (index and history) is passed in per call, so a single pipeline can serve any
/// number of independent sessions.
pub struct ConversationalPipeline {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

impl ConversationalPipeline {
    /// Wire an embedder and chat model together.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        settings: PipelineSettings,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            embedder,
            chat,
            settings,
            metrics,
        }
    }

    /// Answer `question` against `index`, conditioned on `history`.
    ///
    /// The history is only read; appending the new turn is the caller's job so that a failed
    /// call leaves it untouched.
    pub async fn answer(
        &self,
        index: &VectorIndex,
        history: &ConversationHistory,
        question: &str,
    ) -> Result<String, ConversationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ConversationError::EmptyQuestion);
        }

        let standalone = self.standalone_question(history, question).await?;

        let mut vectors = self.embedder.embed(vec![standalone.clone()]).await?;
        let query = vectors.pop().ok_or_else(|| {
            crate::embedding::EmbeddingClientError::InvalidResponse(
                "no vector returned for the question".into(),
            )
        })?;

        let hits = index.search(&query, self.settings.top_k)?;
        tracing::debug!(
            retrieved = hits.len(),
            top_score = hits.first().map(|hit| hit.score),
            "Retrieved context"
        );

        let prompt = prompts::answer_prompt(&standalone, &hits);
        let answer = self.chat.complete(&prompt, history.turns()).await?;

        self.metrics.record_answer();
        tracing::info!(
            turns = history.len() + 1,
            answer_chars = answer.chars().count(),
            "Question answered"
        );
        Ok(answer)
    }

    async fn standalone_question(
        &self,
        history: &ConversationHistory,
        question: &str,
    ) -> Result<String, ConversationError> {
        if !self.settings.condense_follow_ups || history.is_empty() {
            return Ok(question.to_string());
        }

        let prompt = prompts::condense_prompt(question, history.turns());
        let rewritten = self.chat.complete(&prompt, &[]).await?;
        let rewritten = rewritten.trim();
        tracing::debug!(original = question, standalone = rewritten, "Condensed follow-up");
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }
}
