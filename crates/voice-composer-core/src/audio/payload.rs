use std::{fmt, sync::Arc};

/// MIME type of payloads produced by the capture sink.
pub const WAV_MIME: &str = "audio/wav";

/// Immutable audio bytes plus their declared MIME type.
///
/// Cloning shares the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Arc<[u8]>,
    mime: Arc<str>,
}

impl Payload {
    /// Wraps raw bytes with the given MIME type.
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl Into<Arc<str>>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    /// The encoded audio bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type, e.g. `audio/wav`.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Whether the declared MIME type is an audio type.
    pub fn is_audio(&self) -> bool {
        is_audio_mime(&self.mime)
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// `audio/*` check, case-insensitive on the top-level type.
pub(crate) fn is_audio_mime(mime: &str) -> bool {
    mime.split('/')
        .next()
        .map(|top| top.trim().eq_ignore_ascii_case("audio"))
        .unwrap_or(false)
        && mime.contains('/')
}
