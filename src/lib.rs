#![deny(missing_docs)]

//! Core library for pdfchat: ask questions about your own PDFs.

/// HTTP routing and REST handlers.
pub mod api;
/// Shared Azure OpenAI HTTP transport.
pub mod azure;
/// Chat-model abstraction and adapters.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Retrieval-augmented question answering.
pub mod conversation;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// In-memory vector index.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline counters.
pub mod metrics;
/// Document processing pipeline utilities.
pub mod processing;
/// Per-session state and the session store.
pub mod session;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

/// Long-lived components shared by every session: the index builder and the answer pipeline.
pub struct AppServices {
    /// Builds vector indexes from uploads.
    pub processor: Arc<processing::DocumentProcessor>,
    /// Answers questions against a session's index.
    pub pipeline: Arc<conversation::ConversationalPipeline>,
    /// Counters shared by both.
    pub metrics: Arc<metrics::PipelineMetrics>,
}

impl AppServices {
    /// Wire the Azure OpenAI adapters described by `config`.
    pub fn from_config(config: &config::Config) -> anyhow::Result<Self> {
        let transport = azure::AzureTransport::new(azure::AzureSettings::from_config(config))?;
        let embedder: Arc<dyn embedding::Embedder> = Arc::new(
            embedding::AzureEmbeddingClient::new(transport.clone(), config.embedding_model.clone()),
        );
        let chat: Arc<dyn chat::ChatModel> = Arc::new(chat::AzureChatClient::new(
            transport,
            config.chat_deployment.clone(),
            config.chat_temperature,
        ));
        let splitter = processing::chunking::CharacterTextSplitter::from_config(config)?;

        Ok(Self::new(
            embedder,
            chat,
            splitter,
            config.embedding_batch_size,
            conversation::PipelineSettings::from_config(config),
        ))
    }

    /// Wire arbitrary embedder and chat implementations.
    pub fn new(
        embedder: Arc<dyn embedding::Embedder>,
        chat: Arc<dyn chat::ChatModel>,
        splitter: processing::chunking::CharacterTextSplitter,
        embedding_batch_size: usize,
        settings: conversation::PipelineSettings,
    ) -> Self {
        let metrics = Arc::new(metrics::PipelineMetrics::new());
        let processor = Arc::new(processing::DocumentProcessor::new(
            embedder.clone(),
            splitter,
            embedding_batch_size,
            metrics.clone(),
        ));
        let pipeline = Arc::new(conversation::ConversationalPipeline::new(
            embedder,
            chat,
            settings,
            metrics.clone(),
        ));
        tracing::info!(
            top_k = settings.top_k,
            condense_follow_ups = settings.condense_follow_ups,
            "Pipeline services initialized"
        );
        Self {
            processor,
            pipeline,
            metrics,
        }
    }
}
