//! Separator-aware character chunking.
//!
//! Text is cut on a separator (a newline by default) and the pieces are greedily merged into
//! chunks of at most `chunk_size` characters. After a chunk is emitted, a tail of its pieces no
//! longer than `chunk_overlap` characters is carried into the next chunk, so context that spans a
//! boundary stays visible to retrieval.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text is budgeted the same way it
//! reads.

use crate::config::Config;

use super::types::ChunkingError;

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Default separator.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Splits text into bounded, overlapping chunks on a separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterTextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl CharacterTextSplitter {
    /// Build a splitter, validating the size budget.
    pub fn new(
        separator: impl Into<String>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ChunkingError> {
        let separator = separator.into();
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap > chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                chunk_size,
            });
        }
        if separator.is_empty() {
            return Err(ChunkingError::EmptySeparator);
        }

        Ok(Self {
            separator,
            chunk_size,
            chunk_overlap,
        })
    }

    /// Splitter configured from `TEXT_SPLITTER_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, ChunkingError> {
        Self::new(
            config.text_splitter_separator.clone(),
            config.text_splitter_chunk_size,
            config.text_splitter_chunk_overlap,
        )
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap budget in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into ordered chunks.
    ///
    /// Returns an empty vector when the text holds nothing but separators and whitespace.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = text
            .split(self.separator.as_str())
            .filter(|piece| !piece.is_empty())
            .collect();
        self.merge_pieces(&pieces)
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let separator_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut window_start = 0;
        let mut total = 0;

        for &piece in pieces {
            let piece_len = char_len(piece);
            let joiner = |window_len: usize| if window_len > 0 { separator_len } else { 0 };

            if total + piece_len + joiner(window.len() - window_start) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }

                let current = &window[window_start..];
                if !current.is_empty() {
                    if let Some(chunk) = self.join(current) {
                        chunks.push(chunk);
                    }

                    // Shed leading pieces until the retained tail fits the overlap budget and
                    // leaves room for the incoming piece.
                    while window_start < window.len()
                        && (total > self.chunk_overlap
                            || (total + piece_len + joiner(window.len() - window_start)
                                > self.chunk_size
                                && total > 0))
                    {
                        let remaining = window.len() - window_start;
                        let (_, first_len) = window[window_start];
                        total -= first_len + if remaining > 1 { separator_len } else { 0 };
                        window_start += 1;
                    }
                }
            }

            window.push((piece, piece_len));
            let window_len = window.len() - window_start;
            total += piece_len + if window_len > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = self.join(&window[window_start..]) {
            chunks.push(chunk);
        }

        chunks
    }

    fn join(&self, pieces: &[(&str, usize)]) -> Option<String> {
        let joined = pieces
            .iter()
            .map(|(piece, _)| *piece)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for CharacterTextSplitter {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
