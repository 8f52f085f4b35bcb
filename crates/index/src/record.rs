use serde::{Deserialize, Serialize};

/// One record written to the vector index: a unique id, the embedding
/// vector, and the source chunk text for retrieval-time display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
}

/// Record id scheme: `{documentName}-{ingestionTimestampMillis}-{chunkIndex}`.
///
/// Unique within one ingestion; collisions with a previous document's ids
/// are irrelevant because the index is cleared before every write.
pub fn record_id(document_name: &str, timestamp_millis: i64, chunk_index: usize) -> String {
    format!("{document_name}-{timestamp_millis}-{chunk_index}")
}
