use crate::{Payload, audio::payload::is_audio_mime};

/// WHAT: Only audio/* MIME types count as audio
/// WHY: Upload ingestion rejects everything else before the pipeline
#[test]
fn given_mime_types_when_checking_audio_then_only_audio_top_level_accepted() {
    // Given/When/Then: A spread of MIME types
    assert!(is_audio_mime("audio/wav"));
    assert!(is_audio_mime("AUDIO/Mpeg"));
    assert!(is_audio_mime("audio/webm;codecs=opus"));
    assert!(!is_audio_mime("video/webm"));
    assert!(!is_audio_mime("text/plain"));
    assert!(!is_audio_mime("audio"));
    assert!(!is_audio_mime(""));
}

/// WHAT: Cloned payloads share bytes and compare equal
/// WHY: Clips are cloned into host events without copying audio data
#[test]
fn given_payload_when_cloned_then_contents_shared() {
    // Given: A payload
    let payload = Payload::new(vec![1u8, 2, 3], "audio/ogg");

    // When: Cloning it
    let copy = payload.clone();

    // Then: Same bytes, same MIME, same backing buffer
    assert_eq!(copy, payload);
    assert_eq!(copy.len(), 3);
    assert!(copy.is_audio());
    assert_eq!(copy.bytes().as_ptr(), payload.bytes().as_ptr());
}
