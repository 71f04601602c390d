// Shared fixtures for integration tests
//
// `ScriptedEngine` stands in for a streaming recognizer: every non-silent
// frame produces one event "<session>#<n>", delivered later from a background
// task, and stop produces a final "FINAL:<session>#final" event.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use voice_relay::audio::EncoderConfig;
use voice_relay::recognition::{
    RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionEvent,
    RecognitionHandle, Transcription, Translation, TranslationResult,
};
use voice_relay::{RegistrySettings, SessionRegistry};

#[derive(Debug, Default)]
pub struct EngineLog {
    pub started: Vec<String>,
    pub frames: usize,
    pub stopped: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedEngine {
    pub log: Arc<Mutex<EngineLog>>,
    pub fail_start: AtomicBool,
    pub fail_send: Arc<AtomicBool>,
    pub fail_stop: Arc<AtomicBool>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> usize {
        self.log.lock().unwrap().frames
    }

    pub fn started(&self) -> usize {
        self.log.lock().unwrap().started.len()
    }

    pub fn stopped(&self) -> usize {
        self.log.lock().unwrap().stopped.len()
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn start(
        &self,
        session_id: &str,
        config: RecognitionConfig,
        callback: Arc<dyn RecognitionCallback>,
    ) -> Result<Box<dyn RecognitionHandle>> {
        if self.fail_start.load(Ordering::SeqCst) {
            bail!("engine offline");
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<RecognitionEvent>();
        let delivery = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tokio::task::yield_now().await;
                callback.on_event(event).await;
            }
        });

        self.log.lock().unwrap().started.push(session_id.to_string());

        Ok(Box::new(ScriptedHandle {
            session_id: session_id.to_string(),
            target_language: config.target_languages[0].clone(),
            events: Some(tx),
            delivery: Some(delivery),
            spoken: 0,
            log: Arc::clone(&self.log),
            fail_send: Arc::clone(&self.fail_send),
            fail_stop: Arc::clone(&self.fail_stop),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedHandle {
    session_id: String,
    target_language: String,
    events: Option<mpsc::UnboundedSender<RecognitionEvent>>,
    delivery: Option<JoinHandle<()>>,
    spoken: usize,
    log: Arc<Mutex<EngineLog>>,
    fail_send: Arc<AtomicBool>,
    fail_stop: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl RecognitionHandle for ScriptedHandle {
    async fn send_frame(&mut self, pcm: &[u8]) -> Result<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            bail!("frame rejected");
        }
        let Some(events) = &self.events else {
            bail!("already stopped");
        };

        self.log.lock().unwrap().frames += 1;

        if pcm.iter().any(|&b| b != 0) {
            self.spoken += 1;
            let _ = events.send(RecognitionEvent {
                transcription: Some(Transcription {
                    text: format!("{}#{}", self.session_id, self.spoken),
                    sentence_end: false,
                }),
                ..Default::default()
            });
        }

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(events) = self.events.take() else {
            bail!("already stopped");
        };

        let _ = events.send(RecognitionEvent {
            transcription: Some(Transcription {
                text: format!("{}#final", self.session_id),
                sentence_end: true,
            }),
            translation: Some(TranslationResult {
                translations: vec![Translation {
                    language: self.target_language.clone(),
                    text: "FINAL:".to_string(),
                    sentence_end: true,
                }],
            }),
            usage: None,
        });
        drop(events);

        if let Some(delivery) = self.delivery.take() {
            delivery.await?;
        }

        self.log.lock().unwrap().stopped.push(self.session_id.clone());

        if self.fail_stop.load(Ordering::SeqCst) {
            bail!("stop acknowledgement lost");
        }
        Ok(())
    }
}

pub fn registry(recordings_dir: &Path, engine: Arc<ScriptedEngine>) -> SessionRegistry {
    SessionRegistry::new(
        engine,
        RegistrySettings {
            recognition: RecognitionConfig::default(),
            target_language: "en".to_string(),
            encoder: EncoderConfig::default(),
            recordings_dir: recordings_dir.to_path_buf(),
        },
    )
}

/// `ms` milliseconds of 16kHz mono silence
pub fn silence(ms: usize) -> Vec<u8> {
    vec![0u8; 16 * ms * 2]
}

/// `ms` milliseconds of 16kHz mono tone standing in for speech
pub fn speech(ms: usize) -> Vec<u8> {
    (0..16 * ms)
        .map(|i| {
            let t = i as f32 / 16000.0;
            ((t * 220.0 * std::f32::consts::TAU).sin() * 6000.0) as i16
        })
        .flat_map(|s| s.to_le_bytes())
        .collect()
}
