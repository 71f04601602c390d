use tracing::debug;

use super::results::ResultBuffer;
use crate::recognition::{RecognitionCallback, RecognitionEvent};

/// Recognition callback bound to one session's result buffer
pub struct SessionCallback {
    session_id: String,
    target_language: String,
    results: ResultBuffer,
}

impl SessionCallback {
    pub fn new(session_id: String, target_language: String, results: ResultBuffer) -> Self {
        Self {
            session_id,
            target_language,
            results,
        }
    }

    /// Translation text immediately followed by transcription text
    pub fn format(&self, event: &RecognitionEvent) -> String {
        let translation_text = event
            .translation
            .as_ref()
            .and_then(|t| t.get(&self.target_language))
            .map(|t| t.text.as_str())
            .unwrap_or_default();
        let rec_text = event
            .transcription
            .as_ref()
            .map(|t| t.text.as_str())
            .unwrap_or_default();

        format!("{translation_text}{rec_text}")
    }
}

#[async_trait::async_trait]
impl RecognitionCallback for SessionCallback {
    async fn on_event(&self, event: RecognitionEvent) {
        let result = self.format(&event);
        debug!("Session {} result: {}", self.session_id, result);
        self.results.append(result).await;
    }
}
