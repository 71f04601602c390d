use anyhow::{bail, Context, Result};
use async_nats::Client;
use base64::Engine;
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::engine::{
    RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionEvent,
    RecognitionHandle, Transcription, Translation, TranslationResult,
};
use crate::nats::{AudioFrameMessage, TranscriptMessage};

/// Partial and final transcripts of every session; filtered by `session_id`
const TRANSCRIPT_SUBJECT: &str = "stt.text.>";

/// Relays session audio to an STT service listening on NATS
pub struct NatsEngine {
    url: String,
    stop_timeout: Duration,
}

impl NatsEngine {
    pub fn new(url: impl Into<String>, stop_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            stop_timeout,
        }
    }
}

/// Subject the STT service reads a session's audio from
pub fn audio_subject(session_id: &str) -> String {
    format!("audio.frame.meeting-{}", session_id)
}

/// Wrap one PCM chunk for the audio subject
///
/// The terminating frame is empty with `final` set.
pub fn frame_message(
    session_id: &str,
    pcm: &[u8],
    sample_rate: u32,
    sequence: u32,
    is_final: bool,
) -> AudioFrameMessage {
    AudioFrameMessage {
        session_id: session_id.to_string(),
        sequence,
        pcm: base64::engine::general_purpose::STANDARD.encode(pcm),
        sample_rate,
        channels: 1,
        timestamp: chrono::Utc::now().to_rfc3339(),
        final_frame: is_final,
    }
}

/// Map one transcript message to an engine event
pub fn transcript_event(message: &TranscriptMessage) -> RecognitionEvent {
    let translation = if message.translations.is_empty() {
        None
    } else {
        Some(TranslationResult {
            translations: message
                .translations
                .iter()
                .map(|t| Translation {
                    language: t.language.clone(),
                    text: t.text.clone(),
                    sentence_end: !message.partial,
                })
                .collect(),
        })
    };

    RecognitionEvent {
        transcription: Some(Transcription {
            text: message.text.clone(),
            sentence_end: !message.partial,
        }),
        translation,
        usage: None,
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for NatsEngine {
    async fn start(
        &self,
        session_id: &str,
        config: RecognitionConfig,
        callback: Arc<dyn RecognitionCallback>,
    ) -> Result<Box<dyn RecognitionHandle>> {
        info!("Connecting to NATS at {}", self.url);
        let client = async_nats::connect(self.url.as_str())
            .await
            .context("Failed to connect to NATS")?;

        let mut transcript_sub = client
            .subscribe(TRANSCRIPT_SUBJECT)
            .await
            .context("Failed to subscribe to transcripts")?;

        let subject = audio_subject(session_id);
        let owner = session_id.to_string();
        let session_id = session_id.to_string();
        let listener = tokio::spawn(async move {
            info!("Transcript receiving task started for {}", session_id);

            while let Some(msg) = transcript_sub.next().await {
                match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                    Ok(transcript) => {
                        // Filter by session_id
                        if transcript.session_id != session_id {
                            continue;
                        }

                        callback.on_event(transcript_event(&transcript)).await;

                        if transcript.final_transcript {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse transcript message: {}", e);
                    }
                }
            }

            info!("Transcript receiving task stopped for {}", session_id);
        });

        Ok(Box::new(NatsHandle {
            client,
            session_id: owner,
            subject,
            sample_rate: config.sample_rate,
            sequence: 0,
            listener: Some(listener),
            stop_timeout: self.stop_timeout,
        }))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

struct NatsHandle {
    client: Client,
    session_id: String,
    subject: String,
    sample_rate: u32,
    sequence: u32,
    listener: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

impl NatsHandle {
    async fn publish(&self, pcm: &[u8], is_final: bool) -> Result<()> {
        let message = frame_message(
            &self.session_id,
            pcm,
            self.sample_rate,
            self.sequence,
            is_final,
        );

        self.client
            .publish(self.subject.clone(), serde_json::to_vec(&message)?.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (sequence={}, bytes={}, final={})",
            self.subject,
            self.sequence,
            pcm.len(),
            is_final
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecognitionHandle for NatsHandle {
    async fn send_frame(&mut self, pcm: &[u8]) -> Result<()> {
        if self.listener.is_none() {
            bail!("NATS relay for {} already stopped", self.session_id);
        }

        self.publish(pcm, false).await?;
        self.sequence += 1;

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut listener) = self.listener.take() else {
            bail!("NATS relay for {} already stopped", self.session_id);
        };

        // Send final frame
        let published = match self.publish(&[], true).await {
            Ok(()) => self
                .client
                .flush()
                .await
                .context("Failed to flush NATS connection"),
            Err(e) => Err(e),
        };

        match &published {
            Ok(()) => match timeout(self.stop_timeout, &mut listener).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => bail!("Transcript task panicked: {}", e),
                Err(_) => warn!(
                    "No final transcript for {} within {:?}",
                    self.session_id,
                    self.stop_timeout
                ),
            },
            Err(e) => error!("Failed to send final frame: {:#}", e),
        }

        // No callback may run once stop returns
        listener.abort();
        let _ = listener.await;

        published
    }
}

impl Drop for NatsHandle {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nats::TranslationMessage;

    fn transcript(partial: bool, translations: Vec<TranslationMessage>) -> TranscriptMessage {
        TranscriptMessage {
            session_id: "s1".to_string(),
            text: "bonjour".to_string(),
            partial,
            timestamp: "2025-10-27T14:30:05Z".to_string(),
            confidence: Some(0.9),
            translations,
            final_transcript: false,
        }
    }

    #[test]
    fn test_partial_transcript_without_translation() {
        let event = transcript_event(&transcript(true, vec![]));

        let transcription = event.transcription.unwrap();
        assert_eq!(transcription.text, "bonjour");
        assert!(!transcription.sentence_end);
        assert!(event.translation.is_none());
    }

    #[test]
    fn test_frame_message_carries_session_and_sequence() {
        let frame = frame_message("s1", &[1, 2, 3, 4], 16000, 7, false);

        assert_eq!(frame.session_id, "s1");
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.channels, 1);
        assert!(!frame.final_frame);
        assert_eq!(
            base64::engine::general_purpose::STANDARD
                .decode(&frame.pcm)
                .unwrap(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(audio_subject("s1"), "audio.frame.meeting-s1");
    }

    #[test]
    fn test_final_frame_is_empty() {
        let frame = frame_message("s1", &[], 16000, 3, true);
        assert!(frame.final_frame);
        assert!(frame.pcm.is_empty());
    }

    #[test]
    fn test_final_transcript_with_translation() {
        let event = transcript_event(&transcript(
            false,
            vec![TranslationMessage {
                language: "en".to_string(),
                text: "hello".to_string(),
            }],
        ));

        assert!(event.transcription.unwrap().sentence_end);
        let translation = event.translation.unwrap();
        assert_eq!(translation.get("en").unwrap().text, "hello");
    }
}
