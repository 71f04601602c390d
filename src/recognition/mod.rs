//! Streaming speech recognition backends
//!
//! Sessions talk to a `RecognitionEngine` through a start/feed/stop contract
//! and receive results asynchronously through a `RecognitionCallback`:
//! - `dashscope` - DashScope real-time transcription + translation over WebSocket
//! - `nats` - any STT service consuming `audio.frame.*` and publishing `stt.text.*`

pub mod dashscope;
pub mod engine;
pub mod nats;

pub use dashscope::DashscopeEngine;
pub use engine::{
    RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionEvent,
    RecognitionHandle, Transcription, Translation, TranslationResult, Usage,
};
pub use nats::NatsEngine;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{EngineKind, RecognitionSettings};

/// Build the configured engine
pub fn create_engine(settings: &RecognitionSettings) -> Result<Arc<dyn RecognitionEngine>> {
    match settings.engine {
        EngineKind::Dashscope => Ok(Arc::new(DashscopeEngine::new(
            &settings.dashscope.url,
            settings.dashscope.resolve_api_key()?,
            settings.start_timeout(),
            settings.stop_timeout(),
        )?)),
        EngineKind::Nats => Ok(Arc::new(NatsEngine::new(
            settings.nats.url.clone(),
            settings.stop_timeout(),
        ))),
    }
}
