//! Core data types and error definitions for the processing pipeline.

use crate::embedding::EmbeddingClientError;
use crate::index::IndexError;
use thiserror::Error;

/// Guidance shown when a processing action is triggered without any uploads.
pub const NO_DOCUMENTS_MESSAGE: &str = "Please upload at least one PDF file.";

/// Errors produced while configuring the chunker.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap cannot exceed the chunk itself.
    #[error("chunk overlap ({overlap}) must not exceed chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        chunk_size: usize,
    },
    /// Separator must contain at least one character.
    #[error("chunk separator must not be empty")]
    EmptySeparator,
}

/// Errors raised while reading text out of PDF uploads.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A file could not be parsed as a PDF.
    #[error("Could not read PDF '{name}': {reason}")]
    Unreadable {
        /// Display name of the offending upload.
        name: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// The blocking extraction task died before returning.
    #[error("PDF extraction task failed: {0}")]
    Worker(String),
}

/// Errors emitted by the document processing pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Processing was triggered with an empty upload list.
    #[error("{}", NO_DOCUMENTS_MESSAGE)]
    NoDocuments,
    /// Uploaded files contained no text that could be chunked.
    #[error("The uploaded PDFs contain no extractable text.")]
    NoExtractableText,
    /// Text extraction failed for an upload.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Embedding provider failed to produce vectors for the input text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vectors could not be assembled into an index.
    #[error("Failed to build index: {0}")]
    Index(#[from] IndexError),
}

impl ProcessingError {
    /// User-facing guidance for input errors; `None` for service and internal failures that
    /// should surface as errors.
    pub fn guidance(&self) -> Option<String> {
        match self {
            Self::NoDocuments
            | Self::NoExtractableText
            | Self::Extraction(ExtractionError::Unreadable { .. }) => Some(self.to_string()),
            Self::Extraction(ExtractionError::Worker(_)) | Self::Embedding(_) | Self::Index(_) => {
                None
            }
        }
    }
}

/// A single uploaded PDF.
#[derive(Debug, Clone)]
pub struct PdfSource {
    /// File name as uploaded, used in diagnostics.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl PdfSource {
    /// Wrap an in-memory upload.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Summary of a completed index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingOutcome {
    /// Number of PDFs read (zero when the index was built from raw text).
    pub documents: usize,
    /// Characters of extracted text.
    pub characters: usize,
    /// Number of chunks embedded into the index.
    pub chunk_count: usize,
}
