//! In-memory flat vector index.
//!
//! Append-only collection of (vector, chunk) pairs queried by exact
//! nearest-neighbor search. There is no delete or update path; duplicate
//! storage is tolerated, not deduplicated.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// A stored document chunk. Immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub text: String,
    /// Source identifier, e.g. `report.pdf#page=3`.
    pub source: String,
    /// Chunk position within the source document.
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub chunk: StoredChunk,
    /// Squared L2 distance; ordering is identical to true L2.
    pub distance: f32,
}

pub struct VectorIndex {
    dimension: usize,
    entries: RwLock<Vec<(Vec<f32>, StoredChunk)>>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&self, vector: Vec<f32>, chunk: StoredChunk) -> Result<(), ApiError> {
        self.check_dimension(&vector)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::Index("index lock poisoned".to_string()))?;
        entries.push((vector, chunk));
        Ok(())
    }

    /// Nearest-neighbor search, ascending by distance. Returns at most `k`
    /// matches; fewer when the index holds fewer entries.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkMatch>, ApiError> {
        self.check_dimension(query)?;
        let entries = self
            .entries
            .read()
            .map_err(|_| ApiError::Index("index lock poisoned".to_string()))?;

        let mut matches: Vec<ChunkMatch> = entries
            .iter()
            .map(|(vector, chunk)| ChunkMatch {
                chunk: chunk.clone(),
                distance: squared_l2(query, vector),
            })
            .collect();

        matches.sort_by(|left, right| {
            left.distance
                .partial_cmp(&right.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
        Ok(matches)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), ApiError> {
        if vector.len() != self.dimension {
            return Err(ApiError::Index(format!(
                "Vector dimension mismatch: {} != {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> StoredChunk {
        StoredChunk {
            text: text.to_string(),
            source: "test.pdf#page=1".to_string(),
            chunk_index: 0,
        }
    }

    #[test]
    fn search_returns_nearest_first() {
        let index = VectorIndex::new(2);
        index.add(vec![0.0, 0.0], chunk("origin")).unwrap();
        index.add(vec![1.0, 1.0], chunk("diagonal")).unwrap();
        index.add(vec![5.0, 5.0], chunk("far")).unwrap();

        let matches = index.search(&[0.1, 0.1], 2).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].chunk.text, "origin");
        assert_eq!(matches[1].chunk.text, "diagonal");
        assert!(matches[0].distance <= matches[1].distance);
    }

    #[test]
    fn search_with_large_k_returns_all_entries() {
        let index = VectorIndex::new(2);
        index.add(vec![1.0, 0.0], chunk("only")).unwrap();

        let matches = index.search(&[0.0, 1.0], 10).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].chunk.text, "only");
    }

    #[test]
    fn dimension_mismatch_is_an_index_failure() {
        let index = VectorIndex::new(3);
        let err = index.add(vec![1.0, 2.0], chunk("short")).unwrap_err();
        assert!(matches!(err, ApiError::Index(_)));

        let err = index.search(&[1.0], 1).unwrap_err();
        assert!(matches!(err, ApiError::Index(_)));
    }

    #[test]
    fn len_tracks_additions() {
        let index = VectorIndex::new(2);
        assert!(index.is_empty());
        index.add(vec![0.0, 1.0], chunk("a")).unwrap();
        index.add(vec![1.0, 0.0], chunk("b")).unwrap();
        assert_eq!(index.len(), 2);
    }
}
