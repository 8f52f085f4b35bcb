mod api;
mod pipeline;
mod state;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use ragdrop_index::PineconeIndex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    ragdrop_core::config::load_dotenv();
    let config = ragdrop_core::Config::from_env();
    config.validate()?;
    config.log_summary();

    let embedder = ragdrop_ingest::embedding::from_config(&config.embedding)?;

    let (api_key, host) = match (&config.index.api_key, &config.index.host) {
        (Some(key), Some(host)) => (key.clone(), host.clone()),
        _ => anyhow::bail!("index credentials missing"), // unreachable after validate()
    };
    let index = Arc::new(PineconeIndex::new(api_key, host));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(state::AppState {
        config,
        embedder,
        index,
        ingest_lock: Mutex::new(()),
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
