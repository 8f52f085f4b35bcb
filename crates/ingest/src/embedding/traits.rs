use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Batch length mismatch: sent {sent} texts, got {got} vectors")]
    LengthMismatch { sent: usize, got: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Transport failures and 5xx/429 responses may succeed on retry; API
    /// rejections and malformed batches will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Http(_) | EmbeddingError::Unavailable(_))
    }
}

/// Embedding task hint, passed through to providers that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding backends (Gemini, OpenAI-compatible, etc.)
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input text, in input
    /// order. Implementations must return `LengthMismatch` rather than a
    /// short batch.
    async fn embed_batch(
        &self,
        texts: &[&str],
        task: TaskType,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;
}
