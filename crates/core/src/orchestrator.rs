use crate::ingest::IngestPipeline;
use crate::session::{ActiveDocument, SessionState};
use crate::synthesizer::AnswerSynthesizer;
use crate::{AskError, DocumentAnswer, IngestError, IngestionReport, SessionStatus, DEFAULT_TOP_K};
use std::path::Path;
use tracing::{debug, info};

/// Upload, ask and status over one shared session.
pub struct QaService {
    pipeline: IngestPipeline,
    synthesizer: AnswerSynthesizer,
    session: SessionState,
    top_k: usize,
}

impl QaService {
    pub fn new(pipeline: IngestPipeline, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            pipeline,
            synthesizer,
            session: SessionState::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Index the PDF at `path` and make it the active document. On error the
    /// previously active document (if any) stays in place.
    pub async fn ingest(&self, path: &Path, file_name: &str) -> Result<IngestionReport, IngestError> {
        let index = self.pipeline.build_index(path, file_name).await?;
        let report = IngestionReport {
            fingerprint: index.fingerprint().clone(),
            chunk_count: index.len(),
        };

        self.session.replace(ActiveDocument::new(index)).await;
        Ok(report)
    }

    pub async fn ask(&self, question: &str) -> Result<DocumentAnswer, AskError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskError::EmptyQuestion);
        }

        let document = self.session.snapshot().await.ok_or(AskError::NoDocument)?;
        let hits = document.index().search(question, self.top_k).await?;
        debug!(
            file_name = %document.file_name(),
            hit_count = hits.len(),
            top_score = hits.first().map(|hit| hit.score).unwrap_or_default(),
            "retrieved context"
        );

        let context = hits.iter().map(|hit| hit.chunk.text.as_str()).collect::<Vec<_>>();
        let result = self.synthesizer.answer(question, &context).await?;
        info!(file_name = %document.file_name(), answer_chars = result.answer.len(), "question answered");

        Ok(DocumentAnswer {
            answer: result.answer,
            file_name: document.file_name().to_string(),
        })
    }

    pub async fn status(&self) -> SessionStatus {
        self.session.status().await
    }
}
