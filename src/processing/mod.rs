//! Document processing pipeline: PDF extraction, chunking, and embedding into an index.

pub mod chunking;
pub mod extract;
mod service;
pub mod types;

pub use service::DocumentProcessor;
pub use types::{
    ChunkingError, ExtractionError, NO_DOCUMENTS_MESSAGE, PdfSource, ProcessingError,
    ProcessingOutcome,
};
