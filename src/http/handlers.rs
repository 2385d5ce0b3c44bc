use super::state::AppState;
use crate::artifact::ChunkOutcome;
use crate::error::{BridgeError, ErrorInfo, PersistenceError, TransportError};
use crate::transport::ChunkPayload;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub sequence: u64,
    pub appended: bool,
    pub bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScreenshotUpload {
    /// Data URI of the frame; empty when the capture failed
    #[serde(default)]
    pub data_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = match &self {
            BridgeError::Usage(_) => StatusCode::BAD_REQUEST,
            BridgeError::Device(_) => StatusCode::CONFLICT,
            BridgeError::Transport(TransportError::OutOfOrder { .. }) => StatusCode::CONFLICT,
            BridgeError::Transport(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BridgeError::Persistence(PersistenceError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            BridgeError::Persistence(PersistenceError::NotRecording(_)) => StatusCode::CONFLICT,
            BridgeError::Persistence(PersistenceError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: ErrorInfo::from(&self),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recordings/:key/start
/// Truncate the artifact and begin a new generation
pub async fn start_artifact(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, BridgeError> {
    info!("Starting artifact for {}", key);
    let status = state.reassembler.on_start(&key).await?;
    Ok(Json(status))
}

/// POST /recordings/:key/chunks
/// Append one transport-encoded chunk
pub async fn append_chunk(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<ChunkPayload>,
) -> Result<impl IntoResponse, BridgeError> {
    let response = match state.reassembler.on_chunk(&key, &payload).await? {
        ChunkOutcome::Appended { sequence, bytes } => ChunkResponse {
            sequence,
            appended: true,
            bytes,
        },
        ChunkOutcome::Dropped { sequence } => ChunkResponse {
            sequence,
            appended: false,
            bytes: 0,
        },
    };
    Ok(Json(response))
}

/// POST /recordings/:key/stop
/// Finalize the artifact
pub async fn stop_artifact(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, BridgeError> {
    info!("Stopping artifact for {}", key);
    let status = state.reassembler.on_stop(&key).await?;
    Ok(Json(status))
}

/// GET /recordings/:key
/// Retrieval URL, generation and existence flag
pub async fn artifact_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, BridgeError> {
    let status = state.reassembler.status(&key).await?;
    Ok(Json(status))
}

/// POST /screenshots/:slot
/// Replace the slot's screenshot; an empty payload is ignored
pub async fn upload_screenshot(
    State(state): State<AppState>,
    Path(slot): Path<String>,
    Json(upload): Json<ScreenshotUpload>,
) -> Result<Response, BridgeError> {
    match state.screenshots.accept(&slot, &upload.data_uri).await? {
        Some(screenshot) => Ok((StatusCode::OK, Json(screenshot)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// GET /screenshots/:slot
/// The latest screenshot as raw image bytes
pub async fn get_screenshot(State(state): State<AppState>, Path(slot): Path<String>) -> Response {
    match state.screenshots.latest(&slot).await {
        Some(screenshot) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, screenshot.mime_type)],
            screenshot.data,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: ErrorInfo::new("NOT_FOUND", format!("No screenshot for {}", slot)),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
