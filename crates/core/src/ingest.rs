use crate::chunking::{ChunkingConfig, RecursiveSplitter};
use crate::embeddings::Embedder;
use crate::extractor::{extract_page_texts, join_pages};
use crate::store::DocumentIndex;
use crate::{DocumentFingerprint, IngestError};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Extract, chunk, embed and index one PDF. Nothing here touches session
/// state; a failed build simply returns the error.
pub struct IngestPipeline {
    splitter: RecursiveSplitter,
    embedder: Arc<dyn Embedder>,
}

impl IngestPipeline {
    pub fn new(config: ChunkingConfig, embedder: Arc<dyn Embedder>) -> Result<Self, IngestError> {
        Ok(Self {
            splitter: RecursiveSplitter::new(config)?,
            embedder,
        })
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.splitter.config()
    }

    pub async fn build_index(&self, path: &Path, file_name: &str) -> Result<DocumentIndex, IngestError> {
        let owned = path.to_path_buf();
        let (text, page_count, checksum) = tokio::task::spawn_blocking(move || {
            let pages = extract_page_texts(&owned)?;
            let checksum = digest_file(&owned)?;
            Ok::<_, IngestError>((join_pages(&pages), pages.len(), checksum))
        })
        .await
        .map_err(|error| IngestError::Task(error.to_string()))??;

        let chunks = self.splitter.build_chunks(&text, file_name);
        info!(
            file_name,
            page_count,
            text_chars = text.len(),
            chunk_count = chunks.len(),
            "document split into chunks"
        );

        let fingerprint = build_document_fingerprint(path, file_name, checksum, page_count);
        DocumentIndex::build(fingerprint, chunks, self.embedder.clone()).await
    }
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn build_document_fingerprint(
    path: &Path,
    file_name: &str,
    checksum: String,
    page_count: usize,
) -> DocumentFingerprint {
    DocumentFingerprint {
        document_id: generate_document_id(file_name, &checksum),
        file_name: file_name.to_string(),
        source_path: PathBuf::from(path),
        checksum,
        page_count,
        ingested_at: Utc::now(),
    }
}

fn generate_document_id(file_name: &str, checksum: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    hasher.update(checksum.as_bytes());
    format!("{:x}", hasher.finalize())
}
