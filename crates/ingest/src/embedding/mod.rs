pub mod gemini;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use ragdrop_core::config::EmbeddingConfig;
use ragdrop_core::error::ConfigError;

pub use gemini::GeminiEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError, TaskType};

/// Build the configured embedding provider.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ConfigError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .google_api_key
                .clone()
                .ok_or_else(|| ConfigError("GOOGLE_API_KEY is not set".to_string()))?;
            Ok(Arc::new(GeminiEmbedder::new(
                api_key,
                config.model.clone(),
                None,
                config.dimensions,
            )))
        }
        "openai" => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| ConfigError("OPENAI_API_KEY is not set".to_string()))?;
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                config.model.clone(),
                config.openai_base_url.clone(),
                config.dimensions,
            )))
        }
        other => Err(ConfigError(format!("unknown embedding provider '{other}'"))),
    }
}
