use base64::Engine;
use voice_relay::nats::messages::{AudioFrameMessage, TranscriptMessage};
use voice_relay::recognition::nats::transcript_event;

#[test]
fn test_audio_frame_serialization() {
    let msg = AudioFrameMessage {
        session_id: "test-session".to_string(),
        sequence: 0,
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 100]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("test-session"));
    assert!(json.contains("16000"));
    assert!(json.contains("\"final\":false"));
    assert!(json.contains("\"sequence\":0"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.session_id, "test-session");
    assert_eq!(deserialized.sample_rate, 16000);
    assert_eq!(deserialized.channels, 1);
    assert!(!deserialized.final_frame);
}

#[test]
fn test_audio_frame_final_marker() {
    let msg = AudioFrameMessage {
        session_id: "test-session".to_string(),
        sequence: 10,
        pcm: String::new(), // Empty for final marker
        sample_rate: 16000,
        channels: 1,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
        final_frame: true,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"final\":true"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert!(deserialized.final_frame);
    assert!(deserialized.pcm.is_empty());
    assert_eq!(deserialized.sequence, 10);
}

#[test]
fn test_transcript_defaults() {
    let json = r#"{
        "session_id": "test-session",
        "text": "Hello world",
        "partial": false,
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.text, "Hello world");
    assert_eq!(msg.confidence, None);
    assert!(msg.translations.is_empty());
    assert!(!msg.final_transcript);
}

#[test]
fn test_transcript_with_translation_maps_to_event() {
    let json = r#"{
        "session_id": "test-session",
        "text": "你好世界",
        "partial": true,
        "timestamp": "2025-10-27T14:30:05Z",
        "confidence": 0.87,
        "translations": [{"language": "en", "text": "Hello world"}],
        "final": true
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.confidence, Some(0.87));
    assert!(msg.final_transcript);

    let event = transcript_event(&msg);
    assert_eq!(event.transcription.unwrap().text, "你好世界");
    assert_eq!(event.translation.unwrap().get("en").unwrap().text, "Hello world");
}
