use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/start_recording", post(handlers::start_recording))
        .route(
            "/upload_audio/:session_id",
            post(handlers::upload_audio),
        )
        .route(
            "/stop_recording/:session_id",
            post(handlers::stop_recording),
        )
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        // Browser clients upload from any origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
