use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-session configuration of a streaming recognition connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Recognition model (e.g., "gummy-realtime-v1")
    pub model: String,

    /// Sample rate of the streamed audio in Hz
    pub sample_rate: u32,

    /// Wire format of the streamed audio
    pub format: String,

    pub transcription_enabled: bool,

    pub translation_enabled: bool,

    /// Languages the engine translates into
    pub target_languages: Vec<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            model: "gummy-realtime-v1".to_string(),
            sample_rate: 16000,
            format: "pcm".to_string(),
            transcription_enabled: true,
            translation_enabled: true,
            target_languages: vec!["en".to_string()],
        }
    }
}

/// Source-language text recognized so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcription {
    pub text: String,
    /// Whether the current sentence is complete
    pub sentence_end: bool,
}

/// One translated rendition of the current sentence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    pub language: String,
    pub text: String,
    pub sentence_end: bool,
}

/// All translations carried by one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationResult {
    pub translations: Vec<Translation>,
}

impl TranslationResult {
    /// Look up the translation into `language`
    pub fn get(&self, language: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.language == language)
    }
}

/// Billing metadata reported with an event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Usage {
    /// Audio seconds billed so far
    pub duration_secs: Option<u64>,
}

/// One asynchronous notification from the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionEvent {
    pub transcription: Option<Transcription>,
    pub translation: Option<TranslationResult>,
    pub usage: Option<Usage>,
}

/// Receiver of engine events for one connection
///
/// Events are delivered in arrival order from the engine's own task, between
/// `start` and the completion of `stop`.
#[async_trait::async_trait]
pub trait RecognitionCallback: Send + Sync {
    async fn on_event(&self, event: RecognitionEvent);
}

/// A started streaming recognition connection
#[async_trait::async_trait]
pub trait RecognitionHandle: Send + Sync {
    /// Forward one raw PCM chunk; results arrive through the callback
    async fn send_frame(&mut self, pcm: &[u8]) -> Result<()>;

    /// Finish the stream
    ///
    /// Once this returns the callback is never invoked again.
    async fn stop(&mut self) -> Result<()>;
}

/// Streaming speech recognition/translation backend
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Open and start a connection for `session_id` bound to `callback`
    async fn start(
        &self,
        session_id: &str,
        config: RecognitionConfig,
        callback: Arc<dyn RecognitionCallback>,
    ) -> Result<Box<dyn RecognitionHandle>>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
