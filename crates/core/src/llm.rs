use crate::traits::{LlmProvider, Message};
use crate::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";

#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ChatCompletionConfig {
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (Groq by
/// default).
pub struct ChatCompletionProvider {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionProvider {
    pub fn new(config: ChatCompletionConfig) -> Result<Self, GenerationError> {
        let endpoint = completions_endpoint(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            model: config.model,
            api_key: config.api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages: &messages,
                temperature,
                max_tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(model = %self.model, status = status.as_u16(), "completion request rejected");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CompletionResponse = response.json().await?;
        let content = first_content(payload)?;
        debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            answer_chars = content.len(),
            "completion received"
        );
        Ok(content)
    }
}

fn completions_endpoint(base_url: &str) -> Result<Url, GenerationError> {
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized)
        .and_then(|base| base.join("chat/completions"))
        .map_err(|error| GenerationError::Parse(format!("invalid base url {base_url}: {error}")))
}

fn first_content(payload: CompletionResponse) -> Result<String, GenerationError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::Parse("missing choices[0].message.content".to_string()))
}
