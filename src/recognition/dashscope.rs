//! DashScope real-time recognition/translation over a duplex WebSocket task
//!
//! Protocol: the client sends a `run-task` JSON message and waits for
//! `task-started`, streams PCM as binary messages, then sends `finish-task`
//! and waits for `task-finished`. Results arrive as `result-generated`.

use anyhow::{bail, Context, Result};
use futures::stream::{SplitStream, StreamExt};
use futures::SinkExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use super::engine::{
    RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionEvent,
    RecognitionHandle, Transcription, Translation, TranslationResult, Usage,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ServerMessage {
    header: ServerHeader,
    #[serde(default)]
    payload: Option<ServerPayload>,
}

#[derive(Debug, Deserialize)]
struct ServerHeader {
    event: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerPayload {
    #[serde(default)]
    output: Option<ServerOutput>,
    #[serde(default)]
    usage: Option<ServerUsage>,
}

#[derive(Debug, Deserialize)]
struct ServerOutput {
    #[serde(default)]
    transcription: Option<WireTranscription>,
    #[serde(default)]
    translations: Option<Vec<WireTranslation>>,
}

#[derive(Debug, Deserialize)]
struct WireTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    sentence_end: bool,
}

#[derive(Debug, Deserialize)]
struct WireTranslation {
    lang: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    sentence_end: bool,
}

#[derive(Debug, Deserialize)]
struct ServerUsage {
    #[serde(default)]
    duration: Option<u64>,
}

/// Decoded server message
#[derive(Debug, PartialEq)]
enum ServerEvent {
    Started,
    Result(RecognitionEvent),
    Finished,
    Failed { code: String, message: String },
    Other(String),
}

fn parse_server_message(text: &str) -> Result<ServerEvent> {
    let message: ServerMessage =
        serde_json::from_str(text).context("Failed to parse DashScope message")?;

    Ok(match message.header.event.as_str() {
        "task-started" => ServerEvent::Started,
        "task-finished" => ServerEvent::Finished,
        "task-failed" => ServerEvent::Failed {
            code: message.header.error_code.unwrap_or_default(),
            message: message.header.error_message.unwrap_or_default(),
        },
        "result-generated" => {
            let payload = message.payload.unwrap_or(ServerPayload {
                output: None,
                usage: None,
            });
            let (transcription, translation) = match payload.output {
                Some(output) => (
                    output.transcription.map(|t| Transcription {
                        text: t.text,
                        sentence_end: t.sentence_end,
                    }),
                    output.translations.map(|list| TranslationResult {
                        translations: list
                            .into_iter()
                            .map(|t| Translation {
                                language: t.lang,
                                text: t.text,
                                sentence_end: t.sentence_end,
                            })
                            .collect(),
                    }),
                ),
                None => (None, None),
            };

            ServerEvent::Result(RecognitionEvent {
                transcription,
                translation,
                usage: payload.usage.map(|u| Usage {
                    duration_secs: u.duration,
                }),
            })
        }
        other => ServerEvent::Other(other.to_string()),
    })
}

fn run_task_message(task_id: &str, config: &RecognitionConfig) -> serde_json::Value {
    json!({
        "header": {
            "action": "run-task",
            "task_id": task_id,
            "streaming": "duplex",
        },
        "payload": {
            "task_group": "audio",
            "task": "asr",
            "function": "recognition",
            "model": config.model,
            "parameters": {
                "sample_rate": config.sample_rate,
                "format": config.format,
                "transcription_enabled": config.transcription_enabled,
                "translation_enabled": config.translation_enabled,
                "translation_target_languages": config.target_languages,
            },
            "input": {},
        },
    })
}

fn finish_task_message(task_id: &str) -> serde_json::Value {
    json!({
        "header": {
            "action": "finish-task",
            "task_id": task_id,
            "streaming": "duplex",
        },
        "payload": {
            "input": {},
        },
    })
}

// ============================================================================
// Engine
// ============================================================================

/// Connects one WebSocket task per session to DashScope
pub struct DashscopeEngine {
    url: Url,
    api_key: String,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl DashscopeEngine {
    pub fn new(
        url: &str,
        api_key: String,
        start_timeout: Duration,
        stop_timeout: Duration,
    ) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid DashScope URL: {}", url))?;

        Ok(Self {
            url,
            api_key,
            start_timeout,
            stop_timeout,
        })
    }

    async fn open(&self, task_id: &str, config: &RecognitionConfig) -> Result<WsStream> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .context("Failed to build WebSocket request")?;
        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("bearer {}", self.api_key))
                .context("Invalid API key")?,
        );
        headers.insert(
            "X-DashScope-DataInspection",
            HeaderValue::from_static("enable"),
        );

        let (mut ws, _) = connect_async(request)
            .await
            .context("Failed to connect to DashScope")?;

        ws.send(Message::text(run_task_message(task_id, config).to_string()))
            .await
            .context("Failed to send run-task")?;

        // Wait for the task to start before any audio is accepted
        while let Some(message) = ws.next().await {
            let message = message.context("WebSocket error during handshake")?;
            if let Message::Text(text) = message {
                match parse_server_message(&text)? {
                    ServerEvent::Started => return Ok(ws),
                    ServerEvent::Failed { code, message } => {
                        bail!("DashScope task failed to start: {} {}", code, message)
                    }
                    other => debug!("Ignoring message before task-started: {:?}", other),
                }
            }
        }

        bail!("DashScope closed the connection before task-started")
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for DashscopeEngine {
    async fn start(
        &self,
        session_id: &str,
        config: RecognitionConfig,
        callback: Arc<dyn RecognitionCallback>,
    ) -> Result<Box<dyn RecognitionHandle>> {
        let task_id = uuid::Uuid::new_v4().simple().to_string();
        info!(
            "Starting DashScope task {} for session {} (model={})",
            task_id, session_id, config.model
        );

        let ws = timeout(self.start_timeout, self.open(&task_id, &config))
            .await
            .context("Timed out waiting for task-started")??;

        let (mut ws_sink, ws_stream) = ws.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        let task_label = task_id.clone();
        let connection = tokio::spawn(async move {
            let mut ws_stream: SplitStream<WsStream> = ws_stream;

            loop {
                tokio::select! {
                    Some(message) = outgoing_rx.recv() => {
                        if let Err(e) = ws_sink.send(message).await {
                            error!("Failed to send to DashScope: {}", e);
                            break;
                        }
                    }

                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => match parse_server_message(&text) {
                                Ok(ServerEvent::Result(event)) => callback.on_event(event).await,
                                Ok(ServerEvent::Finished) => {
                                    info!("DashScope task {} finished", task_label);
                                    break;
                                }
                                Ok(ServerEvent::Failed { code, message }) => {
                                    error!(
                                        "DashScope task {} failed: {} {}",
                                        task_label, code, message
                                    );
                                    break;
                                }
                                Ok(other) => debug!("DashScope event: {:?}", other),
                                Err(e) => warn!("{:#}", e),
                            },
                            Some(Ok(Message::Close(frame))) => {
                                info!("DashScope closed connection: {:?}", frame);
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("DashScope WebSocket error: {}", e);
                                break;
                            }
                            None => {
                                info!("DashScope stream ended");
                                break;
                            }
                        }
                    }
                }
            }

            let _ = ws_sink.close().await;
        });

        Ok(Box::new(DashscopeHandle {
            task_id,
            outgoing_tx,
            connection: Some(connection),
            stop_timeout: self.stop_timeout,
        }))
    }

    fn name(&self) -> &str {
        "dashscope"
    }
}

struct DashscopeHandle {
    task_id: String,
    outgoing_tx: mpsc::UnboundedSender<Message>,
    connection: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

#[async_trait::async_trait]
impl RecognitionHandle for DashscopeHandle {
    async fn send_frame(&mut self, pcm: &[u8]) -> Result<()> {
        if self.connection.is_none() {
            bail!("DashScope task {} already stopped", self.task_id);
        }

        self.outgoing_tx
            .send(Message::binary(pcm.to_vec()))
            .map_err(|_| anyhow::anyhow!("DashScope task {} connection closed", self.task_id))
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut connection) = self.connection.take() else {
            bail!("DashScope task {} already stopped", self.task_id);
        };

        let finish_sent = self
            .outgoing_tx
            .send(Message::text(finish_task_message(&self.task_id).to_string()))
            .is_ok();

        if !finish_sent {
            // Connection task already exited on its own
            let _ = connection.await;
            bail!("DashScope task {} connection closed before stop", self.task_id);
        }

        match timeout(self.stop_timeout, &mut connection).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => bail!("DashScope connection task panicked: {}", e),
            Err(_) => {
                warn!(
                    "DashScope task {} did not finish within {:?}, aborting",
                    self.task_id, self.stop_timeout
                );
                connection.abort();
                let _ = connection.await;
                Ok(())
            }
        }
    }
}

impl Drop for DashscopeHandle {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
    }
}
