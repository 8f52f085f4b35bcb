use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            chunking: ChunkingConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            index: IndexConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Fail fast on invalid settings, before any external call is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        self.index.validate()?;
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  chunking:  size={}, overlap={}",
            self.chunking.size,
            self.chunking.overlap
        );
        tracing::info!(
            "  embedding: provider={}, model={}, dims={}, batch={}",
            self.embedding.provider,
            self.embedding.model,
            self.embedding.dimensions,
            self.embedding.batch_size
        );
        tracing::info!(
            "  index:     host={}",
            self.index.host.as_deref().unwrap_or("(none)")
        );
        tracing::info!(
            "  pipeline:  stage_timeout={}s, retries={}",
            self.pipeline.stage_timeout_secs,
            self.pipeline.retries
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "server": { "host": self.server.host, "port": self.server.port },
            "chunking": { "size": self.chunking.size, "overlap": self.chunking.overlap },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "configured": self.embedding.is_configured(),
            },
            "index": {
                "host": self.index.host,
                "configured": self.index.is_configured(),
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted upload size in megabytes.
    pub max_upload_mb: u32,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 3001),
            max_upload_mb: env_u32("MAX_UPLOAD_MB", 50),
        }
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub size: usize,
    /// Overlap between adjacent windows, in characters. Must be < size.
    pub overlap: usize,
}

impl ChunkingConfig {
    fn from_env() -> Self {
        Self {
            size: env_usize("CHUNK_SIZE", 1000),
            overlap: env_usize("CHUNK_OVERLAP", 100),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError("CHUNK_SIZE must be > 0".to_string()));
        }
        if self.overlap >= self.size {
            return Err(ConfigError(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 100,
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "gemini" or "openai"
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    /// Chunks per embedding API call.
    pub batch_size: usize,
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

impl EmbeddingConfig {
    fn from_env() -> Self {
        Self {
            provider: env_or("EMBEDDING_PROVIDER", "gemini"),
            model: env_or("EMBEDDING_MODEL", "embedding-001"),
            dimensions: env_usize("EMBEDDING_DIMENSIONS", 768),
            batch_size: env_usize("EMBEDDING_BATCH_SIZE", 64),
            google_api_key: env_opt("GOOGLE_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_opt("OPENAI_BASE_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "gemini" => self.google_api_key.is_some(),
            "openai" => self.openai_api_key.is_some(),
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.as_str() {
            "gemini" => {
                if self.google_api_key.is_none() {
                    return Err(ConfigError(
                        "EMBEDDING_PROVIDER=gemini requires GOOGLE_API_KEY".to_string(),
                    ));
                }
            }
            "openai" => {
                if self.openai_api_key.is_none() {
                    return Err(ConfigError(
                        "EMBEDDING_PROVIDER=openai requires OPENAI_API_KEY".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError(format!(
                    "unknown EMBEDDING_PROVIDER '{other}' (expected 'gemini' or 'openai')"
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(ConfigError("EMBEDDING_BATCH_SIZE must be > 0".to_string()));
        }
        Ok(())
    }
}

// ── Vector index ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub api_key: Option<String>,
    /// Index host, e.g. "my-index-abc123.svc.us-east-1.pinecone.io".
    pub host: Option<String>,
}

impl IndexConfig {
    fn from_env() -> Self {
        Self {
            api_key: env_opt("PINECONE_API_KEY"),
            host: env_opt("PINECONE_HOST"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.host.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            return Err(ConfigError("PINECONE_API_KEY is not set".to_string()));
        }
        if self.host.is_none() {
            return Err(ConfigError("PINECONE_HOST is not set".to_string()));
        }
        Ok(())
    }
}

// ── Pipeline ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound per pipeline stage (extraction, one embed call, one index call).
    pub stage_timeout_secs: u64,
    /// Extra attempts for transient embedding/index failures. 0 disables retry.
    pub retries: u32,
    /// Base backoff between retry attempts; doubles per attempt.
    pub retry_backoff_ms: u64,
}

impl PipelineConfig {
    fn from_env() -> Self {
        Self {
            stage_timeout_secs: env_u64("STAGE_TIMEOUT_SECS", 60),
            retries: env_u32("PIPELINE_RETRIES", 2),
            retry_backoff_ms: env_u64("RETRY_BACKOFF_MS", 200),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 60,
            retries: 2,
            retry_backoff_ms: 200,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────
