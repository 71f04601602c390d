use super::state::AppState;
use crate::error::ErrorResponse;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StartRecordingResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadAudioResponse {
    pub status: String,
    pub results: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub results: Vec<String>,
}

/// Multipart field carrying the raw PCM chunk
const AUDIO_FIELD: &str = "data";

fn bad_request(message: String) -> Response {
    warn!("Bad request: {}", message);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /start_recording
/// Start a new recording session
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.create().await {
        Ok(session_id) => {
            info!("Recording started for session: {}", session_id);
            (StatusCode::OK, Json(StartRecordingResponse { session_id })).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /upload_audio/:session_id
/// Relay one PCM chunk and return the results recognized since the last upload
pub async fn upload_audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut pcm = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(AUDIO_FIELD) => match field.bytes().await {
                Ok(bytes) => {
                    pcm = Some(bytes);
                    break;
                }
                Err(e) => return bad_request(format!("Failed to read audio data: {}", e)),
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return bad_request(format!("Invalid multipart body: {}", e)),
        }
    }

    let Some(pcm) = pcm else {
        return bad_request(format!("Missing '{}' field", AUDIO_FIELD));
    };

    match state.registry.ingest(&session_id, &pcm).await {
        Ok(results) => (
            StatusCode::OK,
            Json(UploadAudioResponse {
                status: "ok".to_string(),
                results,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /stop_recording/:session_id
/// Stop a session, save its MP3 and return the final results
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping recording for session: {}", session_id);

    match state.registry.finish(&session_id).await {
        Ok(finished) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                status: "saved".to_string(),
                results: finished.results,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
