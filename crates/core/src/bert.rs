use crate::embeddings::Embedder;
use crate::error::EmbeddingError;
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

pub const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

/// Sentence-transformers truncates MiniLM inputs at 256 word pieces.
const MAX_SEQUENCE_TOKENS: usize = 256;
const LOCAL_BATCH_SIZE: usize = 32;

#[derive(Deserialize)]
struct ModelShape {
    hidden_size: usize,
}

struct BertRuntime {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Sentence embeddings from a BERT-family checkpoint (all-MiniLM-L6-v2 by
/// default) run in-process on the CPU with candle. Mean pooling over the
/// attention mask, then L2 normalisation.
pub struct LocalBertEmbedder {
    runtime: Arc<BertRuntime>,
    dimensions: usize,
    model_dir: PathBuf,
}

impl LocalBertEmbedder {
    /// Loads `config.json`, `tokenizer.json` and either `model.safetensors`
    /// or `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self, EmbeddingError> {
        let started = Instant::now();
        let model_dir = model_dir.as_ref();
        let device = Device::Cpu;

        let config_path = require_file(model_dir, "config.json")?;
        let tokenizer_path = require_file(model_dir, "tokenizer.json")?;
        let safetensors_path = model_dir.join("model.safetensors");
        let tensors: HashMap<String, Tensor> = if safetensors_path.is_file() {
            candle_core::safetensors::load(&safetensors_path, &device)?
        } else {
            let pickle_path = require_file(model_dir, "pytorch_model.bin")?;
            candle_core::pickle::read_all(&pickle_path)?.into_iter().collect()
        };

        let raw_config = std::fs::read_to_string(&config_path).map_err(|error| {
            EmbeddingError::Model(format!("reading {}: {error}", config_path.display()))
        })?;
        let config: BertConfig = serde_json::from_str(&raw_config).map_err(|error| {
            EmbeddingError::Model(format!("parsing {}: {error}", config_path.display()))
        })?;
        let shape: ModelShape = serde_json::from_str(&raw_config).map_err(|error| {
            EmbeddingError::Model(format!("parsing {}: {error}", config_path.display()))
        })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|error| {
            EmbeddingError::Model(format!("loading {}: {error}", tokenizer_path.display()))
        })?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|error| EmbeddingError::Model(format!("tokenizer truncation: {error}")))?;

        let vb = VarBuilder::from_tensors(tensors, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;

        info!(
            model_dir = %model_dir.display(),
            dimensions = shape.hidden_size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded sentence embedding model"
        );

        Ok(Self {
            runtime: Arc::new(BertRuntime {
                model,
                tokenizer,
                device,
            }),
            dimensions: shape.hidden_size,
            model_dir: model_dir.to_path_buf(),
        })
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl BertRuntime {
    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(LOCAL_BATCH_SIZE) {
            vectors.extend(self.embed_one_batch(batch)?);
        }
        Ok(vectors)
    }

    fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|error| EmbeddingError::Model(format!("tokenization failed: {error}")))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(Tensor::new(encoding.get_ids(), &self.device)?);
            masks.push(Tensor::new(encoding.get_attention_mask(), &self.device)?);
        }

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pool_normalized(&hidden, &attention_mask)?;
        Ok(pooled.to_vec2::<f32>()?)
    }
}

/// `hidden` is `[batch, tokens, hidden]`, `mask` is `[batch, tokens]`.
fn mean_pool_normalized(hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?;
    let mean = summed.broadcast_div(&counts)?;
    let norms = mean.sqr()?.sum_keepdim(1)?.sqrt()?;
    mean.broadcast_div(&norms)
}

fn require_file(model_dir: &Path, name: &str) -> Result<PathBuf, EmbeddingError> {
    let path = model_dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(EmbeddingError::Model(format!(
            "{name} not found in {}; download sentence-transformers/all-MiniLM-L6-v2 \
             (config.json, tokenizer.json, model.safetensors) into that directory",
            model_dir.display()
        )))
    }
}

#[async_trait]
impl Embedder for LocalBertEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let started = Instant::now();
        let runtime = self.runtime.clone();
        let owned = texts.iter().map(|text| text.to_string()).collect::<Vec<_>>();
        let count = owned.len();

        let vectors = tokio::task::spawn_blocking(move || runtime.embed_all(&owned))
            .await
            .map_err(|error| EmbeddingError::Task(error.to_string()))??;

        debug!(
            texts = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "local embedding batch"
        );
        Ok(vectors)
    }
}
