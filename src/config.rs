use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::EncoderConfig;
use crate::recognition::RecognitionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recordings: RecordingsConfig,
    pub encoder: EncoderConfig,
    pub recognition: RecognitionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Largest accepted upload request body
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingsConfig {
    /// Directory receiving one `<session_id>.mp3` per finished session
    pub path: String,
}

impl RecordingsConfig {
    pub fn dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

/// Which recognition backend sessions are relayed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Dashscope,
    Nats,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionSettings {
    pub engine: EngineKind,
    pub model: String,
    pub target_language: String,
    pub sample_rate: u32,
    pub start_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    pub dashscope: DashscopeConfig,
    pub nats: NatsConfig,
}

impl RecognitionSettings {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Per-session configuration handed to the engine on every `start`
    pub fn session_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            model: self.model.clone(),
            sample_rate: self.sample_rate,
            format: "pcm".to_string(),
            transcription_enabled: true,
            translation_enabled: true,
            target_languages: vec![self.target_language.clone()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashscopeConfig {
    pub url: String,
    /// Falls back to `DASHSCOPE_API_KEY` when unset
    pub api_key: Option<String>,
}

impl DashscopeConfig {
    pub fn resolve_api_key(&self) -> Result<String> {
        match &self.api_key {
            Some(key) if !key.is_empty() => Ok(key.clone()),
            _ => std::env::var("DASHSCOPE_API_KEY")
                .context("No DashScope API key configured and DASHSCOPE_API_KEY is not set"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

impl Config {
    /// Load defaults, then the optional file at `path`, then `VOICE_RELAY__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("VOICE_RELAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "voice-relay")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8000)?
            .set_default("service.http.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("recordings.path", "./recordings")?
            .set_default("encoder.sample_rate", 16000)?
            .set_default("encoder.channels", 1)?
            .set_default("encoder.bitrate_kbps", 128)?
            .set_default("encoder.quality", 2)?
            .set_default("recognition.engine", "dashscope")?
            .set_default("recognition.model", "gummy-realtime-v1")?
            .set_default("recognition.target_language", "en")?
            .set_default("recognition.sample_rate", 16000)?
            .set_default("recognition.start_timeout_ms", 10_000)?
            .set_default("recognition.stop_timeout_ms", 30_000)?
            .set_default(
                "recognition.dashscope.url",
                "wss://dashscope.aliyuncs.com/api-ws/v1/inference",
            )?
            .set_default("recognition.nats.url", "nats://localhost:4222")?)
    }
}
