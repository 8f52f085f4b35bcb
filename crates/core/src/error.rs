use thiserror::Error;

/// Invalid or missing configuration, detected before any external call.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// Failure of one ingestion pipeline stage.
///
/// Every stage failure is mapped to exactly one of these variants at the
/// orchestrator boundary; the variant names the stage reported to the caller.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("index write failed: {0}")]
    IndexWrite(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("another ingestion is already in flight")]
    Busy,
}

impl IngestError {
    /// Stage label carried in the failure response.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::Input(_) => "input",
            IngestError::Extraction(_) => "extraction",
            IngestError::Embedding(_) => "embedding",
            IngestError::IndexWrite(_) => "index_write",
            IngestError::Configuration(_) => "configuration",
            IngestError::Busy => "busy",
        }
    }
}

impl From<ConfigError> for IngestError {
    fn from(e: ConfigError) -> Self {
        IngestError::Configuration(e.0)
    }
}
