use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::results::ResultBuffer;
use super::sink::SessionCallback;
use crate::audio::{EncoderConfig, Mp3Accumulator};
use crate::error::RelayError;
use crate::recognition::{RecognitionConfig, RecognitionEngine, RecognitionHandle};

/// One audio capture + recognition conversation
///
/// Owns the MP3 accumulator, the result buffer fed by its recognition
/// callback, and the live recognition connection. The connection is `Some`
/// while the session is started and `None` once it has been stopped.
pub struct Session {
    id: String,
    started_at: DateTime<Utc>,
    accumulator: Mp3Accumulator,
    results: ResultBuffer,
    recognition: Option<Box<dyn RecognitionHandle>>,
    chunks_ingested: usize,
}

/// What is left of a session after its recognition connection is stopped
pub struct StoppedSession {
    /// Results buffered since the last drain, including those produced by stop
    pub results: Vec<String>,
    /// MP3 stream, flush tail included
    pub audio: Vec<u8>,
    pub chunks_ingested: usize,
    pub duration_secs: f64,
    /// Set when the engine failed to stop cleanly
    pub engine_error: Option<String>,
    /// Set when the MP3 tail could not be written; `audio` then holds every
    /// committed frame without it
    pub encoding_error: Option<String>,
}

impl Session {
    /// Build the session and start its recognition connection
    pub async fn start(
        id: String,
        engine: &dyn RecognitionEngine,
        recognition: RecognitionConfig,
        target_language: String,
        encoder: &EncoderConfig,
    ) -> Result<Self, RelayError> {
        let accumulator =
            Mp3Accumulator::new(encoder).map_err(|e| RelayError::Encoding(format!("{e:#}")))?;
        let results = ResultBuffer::new();
        let callback = Arc::new(SessionCallback::new(
            id.clone(),
            target_language,
            results.clone(),
        ));

        let handle = engine
            .start(&id, recognition, callback)
            .await
            .map_err(|e| RelayError::EngineUnavailable(format!("{e:#}")))?;

        info!("Session {} started on {} engine", id, engine.name());

        Ok(Self {
            id,
            started_at: Utc::now(),
            accumulator,
            results,
            recognition: Some(handle),
            chunks_ingested: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_started(&self) -> bool {
        self.recognition.is_some()
    }

    pub fn chunks_ingested(&self) -> usize {
        self.chunks_ingested
    }

    /// Relay one raw PCM chunk and drain the results buffered so far
    ///
    /// The chunk reaches the encoder only once the engine accepted the frame,
    /// so a rejected chunk leaves the archive and the buffer untouched.
    pub async fn ingest(&mut self, pcm: &[u8]) -> Result<Vec<String>, RelayError> {
        let Some(recognition) = self.recognition.as_mut() else {
            return Err(RelayError::NotFound(self.id.clone()));
        };

        recognition
            .send_frame(pcm)
            .await
            .map_err(|e| RelayError::EngineUnavailable(format!("{e:#}")))?;

        self.accumulator
            .feed(pcm)
            .map_err(|e| RelayError::Encoding(format!("{e:#}")))?;
        self.chunks_ingested += 1;

        Ok(self.results.drain_all().await)
    }

    /// Stop recognition, finalize the MP3 stream and drain the last results
    pub async fn stop(&mut self) -> Result<StoppedSession, RelayError> {
        let Some(mut recognition) = self.recognition.take() else {
            return Err(RelayError::NotFound(self.id.clone()));
        };

        let engine_error = match recognition.stop().await {
            Ok(()) => None,
            Err(e) => {
                warn!("Recognition for session {} did not stop cleanly: {:#}", self.id, e);
                Some(format!("{e:#}"))
            }
        };
        drop(recognition);

        let encoding_error = match self.accumulator.flush() {
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to finalize MP3 stream of session {}: {:#}", self.id, e);
                Some(format!("{e:#}"))
            }
        };

        let duration = Utc::now().signed_duration_since(self.started_at);

        Ok(StoppedSession {
            results: self.results.drain_all().await,
            audio: self.accumulator.take_bytes(),
            chunks_ingested: self.chunks_ingested,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            engine_error,
            encoding_error,
        })
    }
}
