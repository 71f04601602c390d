//! HTTP API for recording clients
//!
//! This module provides a thin REST façade over the session registry:
//! - POST /start_recording - Start a new session
//! - POST /upload_audio/:id - Relay a PCM chunk (multipart field `data`), get new results
//! - POST /stop_recording/:id - Stop a session and save its MP3
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{StartRecordingResponse, StopRecordingResponse, UploadAudioResponse};
pub use routes::create_router;
pub use state::AppState;
