//! Plain-text extraction from uploaded PDFs.
//!
//! Pages are read in page order and sources in upload order; the results are concatenated with
//! no separator between pages or files. Any unreadable upload fails the whole batch.

use super::types::{ExtractionError, PdfSource};
use std::panic::{self, AssertUnwindSafe};

/// Extract and concatenate the text of every page of every source.
///
/// Returns an empty string when the PDFs carry no extractable text.
pub fn extract_text(sources: &[PdfSource]) -> Result<String, ExtractionError> {
    let mut pages_per_source = Vec::with_capacity(sources.len());
    for source in sources {
        let pages = extract_pages(source)?;
        tracing::debug!(
            file = %source.name,
            pages = pages.len(),
            bytes = source.bytes.len(),
            "Extracted PDF text"
        );
        pages_per_source.push(pages);
    }
    Ok(concatenate(pages_per_source))
}

/// Run [`extract_text`] on the blocking pool so PDF parsing never stalls the async runtime.
pub async fn extract_text_blocking(sources: Vec<PdfSource>) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&sources))
        .await
        .map_err(|error| ExtractionError::Worker(error.to_string()))?
}

fn extract_pages(source: &PdfSource) -> Result<Vec<String>, ExtractionError> {
    let bytes = source.bytes.as_slice();
    // The PDF parser panics on some malformed inputs instead of returning an error.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(error)) => Err(ExtractionError::Unreadable {
            name: source.name.clone(),
            reason: error.to_string(),
        }),
        Err(_) => Err(ExtractionError::Unreadable {
            name: source.name.clone(),
            reason: "parser aborted on malformed document".to_string(),
        }),
    }
}

fn concatenate(pages_per_source: Vec<Vec<String>>) -> String {
    pages_per_source.into_iter().flatten().collect()
}
