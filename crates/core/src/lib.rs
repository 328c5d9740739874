pub mod bert;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod session;
pub mod store;
pub mod stores;
pub mod synthesizer;
pub mod traits;

pub use bert::{LocalBertEmbedder, DEFAULT_MODEL_DIR};
pub use chunking::{ChunkingConfig, RecursiveSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL_DIMENSIONS,
};
pub use error::{AskError, EmbeddingError, GenerationError, IngestError, SearchError};
pub use extractor::{extract_page_texts, extract_text, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{digest_file, IngestPipeline};
pub use llm::{ChatCompletionConfig, ChatCompletionProvider, DEFAULT_LLM_MODEL, GROQ_BASE_URL};
pub use models::{
    AnswerResult, Chunk, DocumentAnswer, DocumentFingerprint, IngestionReport, ScoredChunk,
    SessionStatus, DEFAULT_TOP_K, FALLBACK_ANSWER,
};
pub use orchestrator::QaService;
pub use session::{ActiveDocument, SessionState};
pub use store::DocumentIndex;
pub use stores::InMemoryVectorIndex;
pub use synthesizer::{AnswerSynthesizer, GenerationSettings};
pub use traits::{LlmProvider, Message, Role, VectorIndex};
