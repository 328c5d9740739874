use crate::traits::{LlmProvider, Message};
use crate::{AnswerResult, GenerationError, FALLBACK_ANSWER};
use std::sync::Arc;
use tracing::info;

pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 256,
        }
    }
}

pub struct AnswerSynthesizer {
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl AnswerSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_settings(provider, GenerationSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub async fn answer(
        &self,
        question: &str,
        context_chunks: &[&str],
    ) -> Result<AnswerResult, GenerationError> {
        let prompt = render_prompt(question, context_chunks);
        let raw = self
            .provider
            .complete(
                vec![Message::user(prompt)],
                self.settings.temperature,
                self.settings.max_tokens,
            )
            .await?;

        let result = AnswerResult {
            answer: raw.trim().to_string(),
        };
        if result.is_fallback() {
            info!(context_chunks = context_chunks.len(), "model reported the answer is not in the document");
        }
        Ok(result)
    }
}

pub fn render_prompt(question: &str, context_chunks: &[&str]) -> String {
    let context = context_chunks.join(CONTEXT_SEPARATOR);
    format!(
        "You are a document search assistant.\n\
         You will be given a question and excerpts from a document that may contain the answer.\n\n\
         - Answer the question in at most 2 lines.\n\
         - If the answer is not clearly present in the excerpts, reply exactly: \"{FALLBACK_ANSWER}\".\n\n\
         Question: {question}\n\n\
         Excerpts:\n\
         {context}"
    )
}
