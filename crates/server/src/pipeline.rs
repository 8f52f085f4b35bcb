//! Ingestion orchestrator.
//!
//! Runs the stages strictly in sequence — extract, chunk, embed, clear,
//! write — and maps any stage failure to a single `IngestError`. Chunk and
//! vector order is preserved end to end so record `i` always carries the
//! embedding of chunk `i`.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use ragdrop_core::config::PipelineConfig;
use ragdrop_core::IngestError;
use ragdrop_index::{record_id, IndexError, IndexRecord, RecordMetadata};
use ragdrop_ingest::chunker;
use ragdrop_ingest::document::{self, ExtractionError};
use ragdrop_ingest::embedding::{EmbeddingError, TaskType};

use crate::state::AppState;

/// Success acknowledgment for one ingestion.
#[derive(Debug)]
pub struct IngestReport {
    pub filename: String,
    pub chunk_count: usize,
}

/// Ingest one document: the whole pipeline runs under the single-flight
/// lock; a concurrent upload is rejected rather than queued, because an
/// interleaved `clear()`/`upsert()` pair would corrupt the index.
pub async fn ingest(
    state: &AppState,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<IngestReport, IngestError> {
    let _guard = state.ingest_lock.try_lock().map_err(|_| IngestError::Busy)?;

    if bytes.is_empty() {
        return Err(IngestError::Input("empty upload".to_string()));
    }

    let pipeline = &state.config.pipeline;

    // ── Extract ───────────────────────────────────────────────
    let doc = extract(pipeline, filename, bytes).await?;
    info!(
        "Extracted '{}' (type={}): {} chars",
        doc.filename,
        doc.file_type,
        doc.char_count()
    );

    if doc.text.is_empty() {
        return Err(IngestError::Input(format!(
            "document '{}' contains no extractable text \
             (scanned/image PDFs without a text layer are not supported)",
            filename
        )));
    }

    // ── Chunk ─────────────────────────────────────────────────
    let chunks = chunker::chunk(&doc.text, state.config.chunking.size, state.config.chunking.overlap);
    if chunks.is_empty() {
        return Err(IngestError::Input(format!(
            "document '{}' produced no chunks",
            filename
        )));
    }
    info!("Chunked '{}' into {} windows", filename, chunks.len());

    // ── Embed ─────────────────────────────────────────────────
    // The provider may be called once per sub-batch; extending in batch
    // order keeps vector `i` paired with chunk `i`.
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let batch_size = state.config.embedding.batch_size;
    let total_batches = texts.len().div_ceil(batch_size);

    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    let embedder = &state.embedder;
    for (i, batch) in texts.chunks(batch_size).enumerate() {
        let vectors = with_retries(
            pipeline,
            "embedding",
            EmbeddingError::is_transient,
            move || embedder.embed_batch(batch, TaskType::RetrievalDocument),
        )
        .await
        .map_err(|msg| IngestError::Embedding(format!("batch {}/{total_batches}: {msg}", i + 1)))?;
        embeddings.extend(vectors);
    }

    // A short batch would silently pair chunks with the wrong vectors;
    // reject the whole ingestion instead.
    if embeddings.len() != chunks.len() {
        return Err(IngestError::Embedding(format!(
            "expected {} vectors, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    // ── Build records ─────────────────────────────────────────
    let timestamp = Utc::now().timestamp_millis();
    let chunk_count = chunks.len();
    let records: Vec<IndexRecord> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, values)| IndexRecord {
            id: record_id(filename, timestamp, chunk.index),
            values,
            metadata: RecordMetadata { text: chunk.text },
        })
        .collect();

    // ── Clear, then write ─────────────────────────────────────
    // One document resident at a time: the previous document's records are
    // removed before the new ones land.
    let index = &state.index;
    with_retries(pipeline, "index clear", IndexError::is_transient, move || {
        index.clear()
    })
    .await
    .map_err(|msg| IngestError::IndexWrite(format!("clear failed: {msg}")))?;

    let record_slice = &records[..];
    with_retries(pipeline, "index upsert", IndexError::is_transient, move || {
        index.upsert(record_slice)
    })
    .await
    .map_err(|msg| {
        IngestError::IndexWrite(format!(
            "upsert failed after the index was cleared — the index may now be \
             empty; retry the upload: {msg}"
        ))
    })?;

    info!("Ingested '{}': {} records written", filename, chunk_count);

    Ok(IngestReport {
        filename: filename.to_string(),
        chunk_count,
    })
}

/// Run PDF/text extraction on the blocking pool with a stage timeout.
async fn extract(
    pipeline: &PipelineConfig,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<document::ExtractedDocument, IngestError> {
    let name = filename.to_string();
    let task = tokio::task::spawn_blocking(move || document::extract_text(&bytes, &name));

    let joined = tokio::time::timeout(Duration::from_secs(pipeline.stage_timeout_secs), task)
        .await
        .map_err(|_| {
            IngestError::Extraction(format!(
                "timed out after {}s",
                pipeline.stage_timeout_secs
            ))
        })?
        .map_err(|e| IngestError::Extraction(e.to_string()))?;

    match joined {
        Ok(doc) => Ok(doc),
        // A bad extension is the caller's mistake, not the extractor's.
        Err(ExtractionError::UnsupportedType(t)) => Err(IngestError::Input(format!(
            "unsupported file type '{t}' (expected pdf or txt)"
        ))),
        Err(e) => Err(IngestError::Extraction(e.to_string())),
    }
}

/// Run `op` with a per-attempt timeout, retrying transient failures with
/// doubling backoff. Timeouts are not retried — the stage budget is spent.
async fn with_retries<T, E, F, Fut>(
    pipeline: &PipelineConfig,
    op_name: &str,
    is_transient: fn(&E) -> bool,
    mut op: F,
) -> Result<T, String>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let per_attempt = Duration::from_secs(pipeline.stage_timeout_secs);
    let mut attempt = 0u32;
    loop {
        match tokio::time::timeout(per_attempt, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if is_transient(&e) && attempt < pipeline.retries => {
                attempt += 1;
                let delay = pipeline
                    .retry_backoff_ms
                    .saturating_mul(2u64.saturating_pow(attempt - 1));
                warn!("{op_name} failed (attempt {attempt}): {e} — retrying in {delay}ms");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => {
                return Err(format!(
                    "timed out after {}s",
                    pipeline.stage_timeout_secs
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use async_trait::async_trait;
    use ragdrop_core::config::{
        ChunkingConfig, Config, EmbeddingConfig, IndexConfig, PipelineConfig, ServerConfig,
    };
    use ragdrop_ingest::embedding::Embedder;
    use ragdrop_index::VectorIndex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::Mutex;

    /// Deterministic embedder: vector[0] encodes the text's char count, so
    /// chunk/vector correspondence is checkable from the written records.
    struct FakeEmbedder {
        calls: AtomicUsize,
        /// Return this many vectors fewer than requested.
        shortfall: usize,
        /// Fail the first N calls with a transient error.
        fail_first: usize,
    }

    impl FakeEmbedder {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                shortfall: 0,
                fail_first: 0,
            }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed_batch(
            &self,
            texts: &[&str],
            _task: TaskType,
        ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(EmbeddingError::Unavailable("503: overloaded".to_string()));
            }
            Ok(texts
                .iter()
                .take(texts.len() - self.shortfall)
                .map(|t| vec![t.chars().count() as f32, 0.0])
                .collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// In-process index modelling clear-then-write against a keyed store.
    #[derive(Default)]
    struct FakeIndex {
        store: StdMutex<HashMap<String, IndexRecord>>,
        events: StdMutex<Vec<&'static str>>,
        fail_upserts: bool,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn clear(&self) -> Result<(), IndexError> {
            self.events.lock().unwrap().push("clear");
            self.store.lock().unwrap().clear();
            Ok(())
        }

        async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
            self.events.lock().unwrap().push("upsert");
            if self.fail_upserts {
                return Err(IndexError::Api("400: bad vectors".to_string()));
            }
            let mut store = self.store.lock().unwrap();
            for r in records {
                store.insert(r.id.clone(), r.clone());
            }
            Ok(())
        }
    }

    fn test_state(embedder: Arc<FakeEmbedder>, index: Arc<FakeIndex>) -> AppState {
        AppState {
            config: Config {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 0,
                    max_upload_mb: 50,
                },
                chunking: ChunkingConfig::default(),
                embedding: EmbeddingConfig {
                    provider: "gemini".to_string(),
                    model: "embedding-001".to_string(),
                    dimensions: 2,
                    batch_size: 64,
                    google_api_key: Some("test".to_string()),
                    openai_api_key: None,
                    openai_base_url: None,
                },
                index: IndexConfig {
                    api_key: Some("test".to_string()),
                    host: Some("idx.test".to_string()),
                },
                pipeline: PipelineConfig {
                    stage_timeout_secs: 5,
                    retries: 2,
                    retry_backoff_ms: 1,
                },
            },
            embedder,
            index,
            ingest_lock: Mutex::new(()),
        }
    }

    fn text_of_len(n: usize) -> Vec<u8> {
        (0..n).map(|i| b'a' + (i % 26) as u8).collect()
    }

    #[tokio::test]
    async fn reference_scenario_writes_three_records() {
        // 2400 chars, window 1000, overlap 100 -> 3 chunks, 3 records.
        let index = Arc::new(FakeIndex::default());
        let state = test_state(Arc::new(FakeEmbedder::ok()), index.clone());

        let report = ingest(&state, "doc.txt", text_of_len(2400)).await.unwrap();
        assert_eq!(report.chunk_count, 3);

        let store = index.store.lock().unwrap();
        assert_eq!(store.len(), 3);
        for i in 0..3 {
            let record = store
                .values()
                .find(|r| r.id.starts_with("doc.txt-") && r.id.ends_with(&format!("-{i}")))
                .unwrap_or_else(|| panic!("missing record for chunk {i}"));
            // vector[0] is the fake embedding of this record's own text.
            assert_eq!(record.values[0], record.metadata.text.chars().count() as f32);
        }
        let lens: Vec<usize> = {
            let mut v: Vec<&IndexRecord> = store.values().collect();
            v.sort_by(|a, b| a.id.cmp(&b.id));
            v.iter().map(|r| r.metadata.text.chars().count()).collect()
        };
        assert_eq!(lens, vec![1000, 1000, 600]);

        // clear must precede the write.
        assert_eq!(*index.events.lock().unwrap(), vec!["clear", "upsert"]);
    }

    #[tokio::test]
    async fn second_ingestion_supersedes_the_first() {
        let index = Arc::new(FakeIndex::default());
        let state = test_state(Arc::new(FakeEmbedder::ok()), index.clone());

        ingest(&state, "first.txt", text_of_len(2400)).await.unwrap();
        ingest(&state, "second.txt", text_of_len(500)).await.unwrap();

        let store = index.store.lock().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.keys().all(|id| id.starts_with("second.txt-")));
    }

    #[tokio::test]
    async fn empty_upload_is_an_input_error() {
        let embedder = Arc::new(FakeEmbedder::ok());
        let state = test_state(embedder.clone(), Arc::new(FakeIndex::default()));

        let err = ingest(&state, "doc.txt", Vec::new()).await.unwrap_err();
        assert_eq!(err.stage(), "input");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whitespace_only_document_short_circuits_before_embedding() {
        let embedder = Arc::new(FakeEmbedder::ok());
        let index = Arc::new(FakeIndex::default());
        let state = test_state(embedder.clone(), index.clone());

        let err = ingest(&state, "doc.txt", b"   \n\t  \n".to_vec()).await.unwrap_err();
        assert_eq!(err.stage(), "input");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(index.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_extension_is_an_input_error() {
        let state = test_state(Arc::new(FakeEmbedder::ok()), Arc::new(FakeIndex::default()));
        let err = ingest(&state, "image.png", b"bytes".to_vec()).await.unwrap_err();
        assert_eq!(err.stage(), "input");
        assert!(err.to_string().contains("png"));
    }

    #[tokio::test]
    async fn short_embedding_batch_fails_without_touching_the_index() {
        let embedder = Arc::new(FakeEmbedder {
            calls: AtomicUsize::new(0),
            shortfall: 1,
            fail_first: 0,
        });
        let index = Arc::new(FakeIndex::default());
        let state = test_state(embedder, index.clone());

        // 2400 chars -> 3 chunks, but the embedder returns only 2 vectors.
        let err = ingest(&state, "doc.txt", text_of_len(2400)).await.unwrap_err();
        assert_eq!(err.stage(), "embedding");
        assert!(index.events.lock().unwrap().is_empty(), "index must not be touched");
    }

    #[tokio::test]
    async fn transient_embedding_failure_is_retried() {
        let embedder = Arc::new(FakeEmbedder {
            calls: AtomicUsize::new(0),
            shortfall: 0,
            fail_first: 2,
        });
        let index = Arc::new(FakeIndex::default());
        let state = test_state(embedder.clone(), index.clone());

        let report = ingest(&state, "doc.txt", text_of_len(500)).await.unwrap();
        assert_eq!(report.chunk_count, 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(index.store.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn large_retry_budget_does_not_overflow_backoff() {
        // Exponent past 63 must saturate, not panic, on the shift.
        let embedder = Arc::new(FakeEmbedder {
            calls: AtomicUsize::new(0),
            shortfall: 0,
            fail_first: 70,
        });
        let index = Arc::new(FakeIndex::default());
        let mut state = test_state(embedder.clone(), index.clone());
        state.config.pipeline.retries = 80;
        state.config.pipeline.retry_backoff_ms = 0;

        let report = ingest(&state, "doc.txt", text_of_len(500)).await.unwrap();
        assert_eq!(report.chunk_count, 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 71);
    }

    #[tokio::test]
    async fn retries_exhausted_surfaces_embedding_error() {
        let embedder = Arc::new(FakeEmbedder {
            calls: AtomicUsize::new(0),
            shortfall: 0,
            fail_first: 99,
        });
        let state = test_state(embedder.clone(), Arc::new(FakeIndex::default()));

        let err = ingest(&state, "doc.txt", text_of_len(500)).await.unwrap_err();
        assert_eq!(err.stage(), "embedding");
        // initial attempt + 2 retries
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn upsert_failure_after_clear_reports_possible_empty_index() {
        let index = Arc::new(FakeIndex {
            fail_upserts: true,
            ..FakeIndex::default()
        });
        let state = test_state(Arc::new(FakeEmbedder::ok()), index.clone());

        let err = ingest(&state, "doc.txt", text_of_len(500)).await.unwrap_err();
        assert_eq!(err.stage(), "index_write");
        assert!(err.to_string().contains("may now be empty"));
        assert_eq!(*index.events.lock().unwrap(), vec!["clear", "upsert"]);
    }

    #[tokio::test]
    async fn concurrent_ingestion_is_rejected() {
        let state = test_state(Arc::new(FakeEmbedder::ok()), Arc::new(FakeIndex::default()));

        let _held = state.ingest_lock.lock().await;
        let err = ingest(&state, "doc.txt", text_of_len(500)).await.unwrap_err();
        assert!(matches!(err, IngestError::Busy));
    }
}
