//! In-memory vector index with exact cosine nearest-neighbour search.
//!
//! Search is a linear scan over every stored vector. The index is immutable once built;
//! processing a new batch builds a fresh one.

use std::cmp::Ordering;
use thiserror::Error;

/// Errors raised while building or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No (vector, chunk) pairs were supplied.
    #[error("cannot build an index without chunks")]
    Empty,
    /// A vector had no components.
    #[error("embedding vectors must have at least one dimension")]
    ZeroDimension,
    /// A vector's width differs from the index dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed by the first vector of the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
}

/// One stored chunk together with its embedding.
#[derive(Debug, Clone)]
struct IndexedChunk {
    text: String,
    vector: Vec<f32>,
    norm: f32,
}

/// Retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Position of the chunk in the original chunk sequence.
    pub position: usize,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    /// Chunk text.
    pub text: String,
}

/// Immutable collection of (vector, chunk) pairs.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Build an index from order-aligned (vector, chunk) pairs.
    pub fn from_pairs(pairs: Vec<(Vec<f32>, String)>) -> Result<Self, IndexError> {
        let dimension = match pairs.first() {
            Some((vector, _)) if vector.is_empty() => return Err(IndexError::ZeroDimension),
            Some((vector, _)) => vector.len(),
            None => return Err(IndexError::Empty),
        };

        let entries = pairs
            .into_iter()
            .map(|(vector, text)| {
                if vector.len() != dimension {
                    return Err(IndexError::DimensionMismatch {
                        expected: dimension,
                        actual: vector.len(),
                    });
                }
                let norm = l2_norm(&vector);
                Ok(IndexedChunk { text, vector, norm })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dimension, entries })
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no chunks are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Width of every stored vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Stored chunk texts in position order.
    pub fn chunks(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.text.as_str())
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// Ties keep chunk order, so results are deterministic for identical scores.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                (
                    position,
                    cosine_similarity(query, query_norm, &entry.vector, entry.norm),
                )
            })
            .collect();

        scored.sort_by(|(left_pos, left), (right_pos, right)| {
            right
                .partial_cmp(left)
                .unwrap_or(Ordering::Equal)
                .then(left_pos.cmp(right_pos))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchHit {
                position,
                score,
                text: self.entries[position].text.clone(),
            })
            .collect())
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn cosine_similarity(
    query: &[f32],
    query_norm: f32,
    candidate: &[f32],
    candidate_norm: f32,
) -> f32 {
    if query_norm == 0.0 || candidate_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query
        .iter()
        .zip(candidate.iter())
        .map(|(left, right)| left * right)
        .sum();
    dot / (query_norm * candidate_norm)
}
