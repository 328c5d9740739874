use crate::traits::VectorIndex;
use crate::{Chunk, IngestError, ScoredChunk, SearchError};
use async_trait::async_trait;
use std::cmp::Ordering;

/// Brute-force cosine index held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    dimensions: usize,
}

impl InMemoryVectorIndex {
    pub fn new(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self, IngestError> {
        if chunks.len() != embeddings.len() {
            return Err(IngestError::Index(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        if let Some(bad) = embeddings.iter().find(|vector| vector.len() != dimensions) {
            return Err(IngestError::Index(format!(
                "embedding dimension {} != {}",
                bad.len(),
                dimensions
            )));
        }

        Ok(Self {
            entries: chunks.into_iter().zip(embeddings).collect(),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        if self.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let mut scored = self
            .entries
            .iter()
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(vector, query_vector),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.chunk.chunk_id.cmp(&right.chunk.chunk_id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
