use crate::embeddings::Embedder;
use crate::stores::InMemoryVectorIndex;
use crate::traits::VectorIndex;
use crate::{Chunk, DocumentFingerprint, IngestError, ScoredChunk, SearchError};
use std::sync::Arc;
use tracing::debug;

/// Search handle for one indexed document. Holds the embedder used at build
/// time so queries land in the same vector space.
pub struct DocumentIndex {
    fingerprint: DocumentFingerprint,
    index: Box<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl DocumentIndex {
    pub async fn build(
        fingerprint: DocumentFingerprint,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IngestError> {
        let embeddings = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts = chunks.iter().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>();
            embedder.embed_batch(&texts).await?
        };

        let index = InMemoryVectorIndex::new(chunks, embeddings)?;
        debug!(
            file_name = %fingerprint.file_name,
            chunk_count = index.len(),
            dimensions = index.dimensions(),
            "built in-memory index"
        );

        Ok(Self::from_parts(fingerprint, Box::new(index), embedder))
    }

    pub fn from_parts(
        fingerprint: DocumentFingerprint,
        index: Box<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            fingerprint,
            index,
            embedder,
        }
    }

    pub fn fingerprint(&self) -> &DocumentFingerprint {
        &self.fingerprint
    }

    pub fn file_name(&self) -> &str {
        &self.fingerprint.file_name
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        self.index.search_vector(&query_vector, top_k).await
    }
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("fingerprint", &self.fingerprint)
            .field("len", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use chrono::Utc;

    fn fingerprint() -> DocumentFingerprint {
        DocumentFingerprint {
            document_id: "doc-1".to_string(),
            file_name: "manual.pdf".to_string(),
            source_path: "/tmp/manual.pdf".into(),
            checksum: "checksum".to_string(),
            page_count: 1,
            ingested_at: Utc::now(),
        }
    }

    fn chunk(chunk_id: u64, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: "manual.pdf".to_string(),
            chunk_id,
        }
    }

    #[tokio::test]
    async fn empty_document_builds_an_empty_index() -> Result<(), Box<dyn std::error::Error>> {
        let index =
            DocumentIndex::build(fingerprint(), Vec::new(), Arc::new(CharacterNgramEmbedder::default()))
                .await?;
        assert!(index.is_empty());
        assert!(index.search("anything", 4).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn search_embeds_the_query_with_the_build_embedder() -> Result<(), Box<dyn std::error::Error>>
    {
        let chunks = vec![
            chunk(0, "The hydraulic pump must be primed before start-up."),
            chunk(1, "Invoices are payable within thirty days of receipt."),
            chunk(2, "Replace the air filter every five hundred hours."),
        ];
        let index =
            DocumentIndex::build(fingerprint(), chunks, Arc::new(CharacterNgramEmbedder::default()))
                .await?;

        let hits = index.search("Are invoices payable within thirty days?", 1).await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, 1);
        assert_eq!(index.file_name(), "manual.pdf");
        Ok(())
    }

    #[tokio::test]
    async fn search_returns_at_most_top_k() -> Result<(), Box<dyn std::error::Error>> {
        let chunks = (0..10)
            .map(|index| chunk(index, &format!("maintenance note number {index}")))
            .collect();
        let index =
            DocumentIndex::build(fingerprint(), chunks, Arc::new(CharacterNgramEmbedder::default()))
                .await?;

        assert_eq!(index.search("maintenance note", 4).await?.len(), 4);
        Ok(())
    }
}
