use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use super::session::Session;
use crate::audio::EncoderConfig;
use crate::config::Config;
use crate::error::RelayError;
use crate::recognition::{RecognitionConfig, RecognitionEngine};

/// Fixed parameters every new session is created with
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub recognition: RecognitionConfig,
    /// Language whose translation is prepended to each result
    pub target_language: String,
    pub encoder: EncoderConfig,
    /// Where `<session_id>.mp3` artifacts are written
    pub recordings_dir: PathBuf,
}

impl RegistrySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            recognition: config.recognition.session_config(),
            target_language: config.recognition.target_language.clone(),
            encoder: config.encoder.clone(),
            recordings_dir: config.recordings.dir(),
        }
    }
}

/// Outcome of a successful finish
#[derive(Debug, Clone)]
pub struct FinishedSession {
    pub session_id: String,
    pub results: Vec<String>,
    pub artifact: PathBuf,
    pub audio_bytes: usize,
    pub chunks_ingested: usize,
    pub duration_secs: f64,
}

/// Live sessions keyed by id
///
/// The map lock is held only to insert, look up or remove an entry; each
/// session has its own lock, so independent sessions never wait on each
/// other's encode or engine calls.
pub struct SessionRegistry {
    engine: Arc<dyn RecognitionEngine>,
    settings: RegistrySettings,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new(engine: Arc<dyn RecognitionEngine>, settings: RegistrySettings) -> Self {
        Self {
            engine,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Start a new session and register it
    ///
    /// Nothing is registered when the engine fails to start.
    pub async fn create(&self) -> Result<String, RelayError> {
        let session_id = uuid::Uuid::new_v4().to_string();

        let session = Session::start(
            session_id.clone(),
            self.engine.as_ref(),
            self.settings.recognition.clone(),
            self.settings.target_language.clone(),
            &self.settings.encoder,
        )
        .await?;

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));

        info!("Session {} registered", session_id);
        Ok(session_id)
    }

    /// Relay one chunk to the session and return the results drained since the previous call
    pub async fn ingest(&self, session_id: &str, pcm: &[u8]) -> Result<Vec<String>, RelayError> {
        let session = self
            .lookup(session_id)
            .await
            .ok_or_else(|| RelayError::NotFound(session_id.to_string()))?;

        // A concurrent finish may have stopped it since the lookup; the
        // session then reports NotFound itself.
        let mut session = session.lock().await;
        session.ingest(pcm).await
    }

    /// Remove the session, stop it and persist its MP3 archive
    pub async fn finish(&self, session_id: &str) -> Result<FinishedSession, RelayError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| RelayError::NotFound(session_id.to_string()))?;

        let stopped = session.lock().await.stop().await?;

        let artifact = self.artifact_path(session_id);
        if let Err(e) = persist(&artifact, &stopped.audio).await {
            drop_results(session_id, &stopped.results, "storage failure");
            return Err(RelayError::StorageWriteFailure(format!(
                "{}: {}",
                artifact.display(),
                e
            )));
        }

        info!(
            "Session {} saved to {} ({} bytes, {} chunks)",
            session_id,
            artifact.display(),
            stopped.audio.len(),
            stopped.chunks_ingested
        );

        if let Some(encoding_error) = stopped.encoding_error {
            drop_results(session_id, &stopped.results, "encoding failure");
            return Err(RelayError::Encoding(encoding_error));
        }

        if let Some(engine_error) = stopped.engine_error {
            drop_results(session_id, &stopped.results, "engine failure");
            return Err(RelayError::EngineUnavailable(engine_error));
        }

        Ok(FinishedSession {
            session_id: session_id.to_string(),
            results: stopped.results,
            artifact,
            audio_bytes: stopped.audio.len(),
            chunks_ingested: stopped.chunks_ingested,
            duration_secs: stopped.duration_secs,
        })
    }

    /// Finish every session still open
    pub async fn shutdown(&self) -> usize {
        let session_ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        if session_ids.is_empty() {
            return 0;
        }

        info!("Finishing {} open sessions", session_ids.len());

        let mut finished = 0;
        for session_id in session_ids {
            match self.finish(&session_id).await {
                Ok(_) => finished += 1,
                Err(e) => error!("Failed to finish session {} on shutdown: {}", session_id, e),
            }
        }

        finished
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub fn artifact_path(&self, session_id: &str) -> PathBuf {
        self.settings
            .recordings_dir
            .join(format!("{}.mp3", session_id))
    }

    async fn lookup(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

fn drop_results(session_id: &str, results: &[String], cause: &str) {
    if !results.is_empty() {
        warn!(
            "Dropping {} results of session {} after {}",
            results.len(),
            session_id,
            cause
        );
    }
}

async fn persist(path: &Path, audio: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, audio).await
}
