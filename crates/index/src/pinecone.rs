use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::record::IndexRecord;
use crate::traits::{IndexError, VectorIndex};

/// Pinecone keeps upsert payloads bounded; stay under the documented limit.
const UPSERT_BATCH: usize = 100;

/// Vector index writer backed by the Pinecone data-plane REST API.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PineconeIndex {
    /// `host` is the index host from the Pinecone console; a full URL is
    /// also accepted (useful against local mock servers).
    pub fn new(api_key: String, host: String) -> Self {
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{host}")
        };
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
        }
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<(), IndexError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(IndexError::Unavailable(format!("{status}: {text}")));
            }
            return Err(IndexError::Api(format!("{status}: {text}")));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn clear(&self) -> Result<(), IndexError> {
        debug!("Clearing vector index");
        self.post("vectors/delete", &json!({ "deleteAll": true })).await
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
        for batch in records.chunks(UPSERT_BATCH) {
            debug!("Upserting {} records", batch.len());
            self.post("vectors/upsert", &json!({ "vectors": batch })).await?;
        }
        Ok(())
    }
}
