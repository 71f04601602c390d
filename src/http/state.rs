use crate::session::SessionRegistry;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live recording sessions
    pub registry: Arc<SessionRegistry>,

    /// Largest accepted upload request body
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, max_upload_bytes: usize) -> Self {
        Self {
            registry,
            max_upload_bytes,
        }
    }
}
