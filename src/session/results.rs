use std::sync::Arc;
use tokio::sync::Mutex;

/// Result strings waiting for the next upload response
///
/// Appended by the session's recognition callback, drained by chunk ingestion
/// and by finish. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct ResultBuffer {
    results: Arc<Mutex<Vec<String>>>,
}

impl ResultBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, result: String) {
        self.results.lock().await.push(result);
    }

    /// Take everything buffered so far, in arrival order
    pub async fn drain_all(&self) -> Vec<String> {
        std::mem::take(&mut *self.results.lock().await)
    }

    pub async fn is_empty(&self) -> bool {
        self.results.lock().await.is_empty()
    }
}
