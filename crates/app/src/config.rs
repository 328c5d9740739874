use clap::{Parser, ValueEnum};
use pdf_qa_core::{
    ChatCompletionConfig, ChunkingConfig, HttpEmbedderConfig, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_MODEL_DIMENSIONS,
    DEFAULT_MODEL_DIR, DEFAULT_TOP_K, GROQ_BASE_URL,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; export it or add it to .env")]
    MissingCredential(&'static str),

    #[error("invalid URL for {name}: {value} ({source})")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pdf-qa-server", version, about = "Upload a PDF and ask questions about it")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "PDF_QA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PDF_QA_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Where uploaded PDFs are stored. Created at startup.
    #[arg(long, env = "PDF_QA_UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Static front end served at `/`.
    #[arg(long, env = "PDF_QA_FRONTEND_DIR", default_value = "frontend")]
    pub frontend_dir: PathBuf,

    #[arg(long, env = "PDF_QA_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// API key for the chat completion endpoint.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    #[arg(long, env = "LLM_BASE_URL", default_value = GROQ_BASE_URL)]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,

    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    /// Which embedder indexes chunks. Defaults to `http` when
    /// `--embedding-url` is given and to the local model otherwise.
    #[arg(long, env = "EMBEDDING_BACKEND", value_enum)]
    pub embedding_backend: Option<EmbeddingKind>,

    /// Directory holding the local sentence-transformers checkpoint.
    #[arg(long, env = "EMBEDDING_MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    pub embedding_model_dir: PathBuf,

    /// OpenAI-compatible embeddings server.
    #[arg(long, env = "EMBEDDING_URL")]
    pub embedding_url: Option<String>,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_MODEL_DIMENSIONS)]
    pub embedding_dimensions: usize,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    #[arg(long, env = "CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    #[arg(long = "top-k", env = "RETRIEVAL_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingKind {
    /// all-MiniLM-L6-v2 (or another BERT checkpoint) run in-process.
    Local,
    Http,
    /// Hashed character trigrams; no model needed, weaker retrieval.
    Ngram,
}

#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    LocalBert { model_dir: PathBuf },
    Http(HttpEmbedderConfig),
    CharacterNgram { dimensions: usize },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub uploads_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub llm: ChatCompletionConfig,
    pub embedding: EmbeddingBackend,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
}

impl ServerConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_key = cli
            .groq_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential("GROQ_API_KEY"))?;

        let addr = format!("{}:{}", cli.host, cli.port)
            .parse::<SocketAddr>()
            .map_err(|error| ConfigError::InvalidValue {
                name: "PDF_QA_HOST",
                reason: format!("{}:{} ({error})", cli.host, cli.port),
            })?;

        let timeout = Duration::from_secs(cli.llm_timeout_secs.max(1));
        let llm = ChatCompletionConfig {
            base_url: parse_url("LLM_BASE_URL", &cli.llm_base_url)?,
            model: cli.llm_model,
            api_key,
            timeout,
        };

        if cli.embedding_dimensions == 0 {
            return Err(ConfigError::InvalidValue {
                name: "EMBEDDING_DIMENSIONS",
                reason: "must be greater than zero".to_string(),
            });
        }
        let embedding_url = cli.embedding_url.filter(|url| !url.trim().is_empty());
        let kind = cli.embedding_backend.unwrap_or(if embedding_url.is_some() {
            EmbeddingKind::Http
        } else {
            EmbeddingKind::Local
        });
        let embedding = match (kind, embedding_url) {
            (EmbeddingKind::Local, _) => EmbeddingBackend::LocalBert {
                model_dir: cli.embedding_model_dir,
            },
            (EmbeddingKind::Http, Some(url)) => EmbeddingBackend::Http(HttpEmbedderConfig {
                base_url: parse_url("EMBEDDING_URL", &url)?,
                model: cli.embedding_model,
                dimensions: cli.embedding_dimensions,
                api_key: cli.embedding_api_key.filter(|key| !key.trim().is_empty()),
                timeout,
            }),
            (EmbeddingKind::Http, None) => {
                return Err(ConfigError::InvalidValue {
                    name: "EMBEDDING_URL",
                    reason: "required when EMBEDDING_BACKEND=http".to_string(),
                })
            }
            (EmbeddingKind::Ngram, _) => EmbeddingBackend::CharacterNgram {
                dimensions: cli.embedding_dimensions,
            },
        };

        let chunking = ChunkingConfig::new(cli.chunk_size, cli.chunk_overlap);
        chunking.validate().map_err(|error| ConfigError::InvalidValue {
            name: "CHUNK_SIZE/CHUNK_OVERLAP",
            reason: error.to_string(),
        })?;

        if cli.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RETRIEVAL_TOP_K",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            addr,
            uploads_dir: cli.uploads_dir,
            frontend_dir: cli.frontend_dir,
            max_upload_bytes: cli.max_upload_bytes,
            llm,
            embedding,
            chunking,
            top_k: cli.top_k,
        })
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    Url::parse(value)
        .map(|_| value.trim_end_matches('/').to_string())
        .map_err(|source| ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
            source,
        })
}
