use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TOP_K: usize = 4;

/// Literal reply the prompt asks the model to give when the excerpts do not
/// contain the answer. Compliance is not checked.
pub const FALLBACK_ANSWER: &str = "dont know Answer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub file_name: String,
    pub source_path: PathBuf,
    pub checksum: String,
    pub page_count: usize,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub chunk_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
}

impl AnswerResult {
    pub fn is_fallback(&self) -> bool {
        self.answer.trim().trim_matches('"') == FALLBACK_ANSWER
    }
}

/// Answer plus the name of the document it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnswer {
    pub answer: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub file_name: Option<String>,
    pub has_pdf: bool,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub fingerprint: DocumentFingerprint,
    pub chunk_count: usize,
}
