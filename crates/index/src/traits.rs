use async_trait::async_trait;
use thiserror::Error;

use crate::record::IndexRecord;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IndexError {
    /// Transport failures and 5xx/429 responses may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, IndexError::Http(_) | IndexError::Unavailable(_))
    }
}

/// Write protocol against the vector store.
///
/// The consistency model is one document resident at a time: `clear` must
/// be confirmed before any `upsert` for the next document begins.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Remove every record from the index.
    async fn clear(&self) -> Result<(), IndexError>;

    /// Insert-or-replace records, keyed by id.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError>;
}
