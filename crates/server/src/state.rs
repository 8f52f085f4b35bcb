use std::sync::Arc;

use tokio::sync::Mutex;

use ragdrop_core::Config;
use ragdrop_index::VectorIndex;
use ragdrop_ingest::embedding::Embedder;

pub struct AppState {
    pub config: Config,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    /// Single-flight guard: `clear()` + `upsert()` against the shared index
    /// must never interleave across concurrent uploads.
    pub ingest_lock: Mutex<()>,
}
