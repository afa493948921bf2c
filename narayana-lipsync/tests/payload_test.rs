//! Audio payload loading tests for narayana-lipsync

use bytes::Bytes;
use narayana_lipsync::{AudioJob, AudioPayload, InboundMessage, PlaybackError};
use std::path::PathBuf;

#[test]
fn test_load_inline_bytes() {
    let payload = AudioPayload::Bytes(Bytes::from_static(b"RIFF\x24\x00"));
    let loaded = tokio_test::block_on(payload.load()).unwrap();
    assert_eq!(&loaded[..4], b"RIFF");
}

#[test]
fn test_load_missing_file() {
    let payload = AudioPayload::Path(PathBuf::from("/nonexistent/narayana-lipsync/voice.wav"));
    let result = tokio_test::block_on(payload.load());
    assert!(matches!(result, Err(PlaybackError::Payload(msg)) if msg.contains("voice.wav")));
}

#[test]
fn test_message_payload_decodes() {
    let message: InboundMessage = serde_json::from_str(r#"{"audio": "UklGRg==", "slice_length": 0}"#).unwrap();
    let job = AudioJob::from_message(message, 20.0, None);
    assert_eq!(job.slice_duration_ms, 20.0);

    let payload = job.payload.unwrap();
    let loaded = tokio_test::block_on(payload.load()).unwrap();
    assert_eq!(loaded, Bytes::from_static(b"RIFF"));
}
