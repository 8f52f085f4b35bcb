use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::error;

use ragdrop_core::IngestError;

use crate::pipeline;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct UploadResponse {
    filename: String,
    chunk_count: usize,
}

#[derive(Debug, Serialize)]
struct FailureResponse {
    stage: &'static str,
    message: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let max_bytes = state.config.server.max_upload_mb as usize * 1024 * 1024;
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "config": state.config.redacted_summary(),
    }))
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => {
            return failure_response(&IngestError::Input(
                "multipart request contained no file field".to_string(),
            ))
        }
        Err(e) => return failure_response(&IngestError::Input(format!("bad multipart body: {e}"))),
    };

    let filename = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_else(|| "document".to_string());

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => return failure_response(&IngestError::Input(format!("failed to read upload: {e}"))),
    };

    match pipeline::ingest(&state, &filename, bytes).await {
        Ok(report) => (
            StatusCode::OK,
            Json(UploadResponse {
                filename: report.filename,
                chunk_count: report.chunk_count,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Ingestion of '{filename}' failed at {}: {err}", err.stage());
            failure_response(&err)
        }
    }
}

fn failure_response(err: &IngestError) -> Response {
    let status = match err {
        IngestError::Input(_) => StatusCode::BAD_REQUEST,
        IngestError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IngestError::Embedding(_) | IngestError::IndexWrite(_) => StatusCode::BAD_GATEWAY,
        IngestError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        IngestError::Busy => StatusCode::CONFLICT,
    };
    (
        status,
        Json(FailureResponse {
            stage: err.stage(),
            message: err.to_string(),
        }),
    )
        .into_response()
}
