//! Index builder coordinating extraction, chunking, and embedding.

use crate::{
    embedding::Embedder,
    index::VectorIndex,
    metrics::PipelineMetrics,
    processing::{
        chunking::CharacterTextSplitter,
        extract::extract_text_blocking,
        types::{PdfSource, ProcessingError, ProcessingOutcome},
    },
};
use std::sync::Arc;

/// Turns uploaded PDFs into a ready-to-query [`VectorIndex`].
///
/// The processor owns shared handles to the embedder and metrics registry so every session
/// reuses the same components. Construct it once near process start and share it through an
/// `Arc`.
pub struct DocumentProcessor {
    embedder: Arc<dyn Embedder>,
    splitter: CharacterTextSplitter,
    batch_size: usize,
    metrics: Arc<PipelineMetrics>,
}

impl DocumentProcessor {
    /// Build a processor around an embedder and splitter.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        splitter: CharacterTextSplitter,
        batch_size: usize,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            embedder,
            splitter,
            batch_size: batch_size.max(1),
            metrics,
        }
    }

    /// Splitter used for every build.
    pub fn splitter(&self) -> &CharacterTextSplitter {
        &self.splitter
    }

    /// Extract, chunk, embed, and index a batch of uploads.
    pub async fn build_index(
        &self,
        sources: Vec<PdfSource>,
    ) -> Result<(VectorIndex, ProcessingOutcome), ProcessingError> {
        if sources.is_empty() {
            return Err(ProcessingError::NoDocuments);
        }

        let documents = sources.len();
        tracing::info!(documents, "Processing uploaded PDFs");
        let text = extract_text_blocking(sources).await?;
        self.index_text(&text, documents).await
    }

    /// Chunk, embed, and index already-extracted text.
    pub async fn build_index_from_text(
        &self,
        text: &str,
    ) -> Result<(VectorIndex, ProcessingOutcome), ProcessingError> {
        self.index_text(text, 0).await
    }

    async fn index_text(
        &self,
        text: &str,
        documents: usize,
    ) -> Result<(VectorIndex, ProcessingOutcome), ProcessingError> {
        let characters = text.chars().count();
        let chunks = self.splitter.split_text(text);
        tracing::debug!(
            characters,
            chunks = chunks.len(),
            chunk_size = self.splitter.chunk_size(),
            chunk_overlap = self.splitter.chunk_overlap(),
            "Split document text"
        );
        if chunks.is_empty() {
            return Err(ProcessingError::NoExtractableText);
        }

        let vectors = self.embed_in_batches(&chunks).await?;
        let chunk_count = chunks.len();
        let index = VectorIndex::from_pairs(vectors.into_iter().zip(chunks).collect())?;

        self.metrics.record_index(documents as u64, chunk_count as u64);
        tracing::info!(
            documents,
            chunks = chunk_count,
            dimension = index.dimension(),
            "Vector index built"
        );

        Ok((
            index,
            ProcessingOutcome {
                documents,
                characters,
                chunk_count,
            },
        ))
    }

    async fn embed_in_batches(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>, ProcessingError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for (batch_number, batch) in chunks.chunks(self.batch_size).enumerate() {
            tracing::debug!(batch = batch_number, size = batch.len(), "Embedding batch");
            let embedded = self.embedder.embed(batch.to_vec()).await?;
            if embedded.len() != batch.len() {
                return Err(ProcessingError::Embedding(
                    crate::embedding::EmbeddingClientError::InvalidResponse(format!(
                        "expected {} vectors, received {}",
                        batch.len(),
                        embedded.len()
                    )),
                ));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
