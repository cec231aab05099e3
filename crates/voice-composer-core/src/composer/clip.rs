use crate::{
    AudioError, CoreResult,
    analysis::Waveform,
    audio::{PlayableRef, Payload, payload::is_audio_mime},
};

use std::{fmt, panic::Location, path::Path, time::Duration};

use error_location::ErrorLocation;
use uuid::Uuid;

/// Unique clip identity: a time-ordered UUID (millisecond timestamp plus
/// random bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(Uuid);

impl ClipId {
    /// Fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOrigin {
    /// Captured from the microphone.
    Recorded,
    /// Ingested from a file.
    Uploaded,
}

/// A self-contained unit of audio with its summary and playable reference.
///
/// The playable reference stays valid until the container holding the clip
/// revokes it on disposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub(crate) id: ClipId,
    pub(crate) origin: ClipOrigin,
    pub(crate) name: String,
    pub(crate) payload: Payload,
    pub(crate) playable: PlayableRef,
    pub(crate) duration: Option<Duration>,
    pub(crate) waveform: Waveform,
}

impl Clip {
    /// Assembles a clip around an already-derived playable reference.
    pub fn new(
        origin: ClipOrigin,
        name: impl Into<String>,
        payload: Payload,
        playable: PlayableRef,
        duration: Option<Duration>,
        waveform: Waveform,
    ) -> Self {
        Self {
            id: ClipId::new(),
            origin,
            name: name.into(),
            payload,
            playable,
            duration,
            waveform,
        }
    }

    /// Unique id.
    pub fn id(&self) -> ClipId {
        self.id
    }

    /// Recorded or uploaded.
    pub fn origin(&self) -> ClipOrigin {
        self.origin
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Audio bytes and MIME type.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Backend reference for playback.
    pub fn playable(&self) -> PlayableRef {
        self.playable
    }

    /// Known length, when it could be determined.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Fixed-length amplitude summary.
    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }
}

/// A user-supplied file awaiting ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// File name shown as the clip name.
    pub name: String,
    /// Declared MIME type.
    pub mime: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// File with an explicit MIME type.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// File whose MIME type is guessed from the extension of `path`.
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            mime: mime_for_path(path).to_string(),
            bytes,
        }
    }

    /// Rejects anything that is not `audio/*`.
    #[track_caller]
    pub fn ensure_audio(&self) -> CoreResult<()> {
        if is_audio_mime(&self.mime) {
            return Ok(());
        }
        Err(AudioError::UnsupportedPayload {
            mime: self.mime.clone(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// MIME type for common audio extensions, `application/octet-stream` otherwise.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" | "wave" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" | "weba" => "audio/webm",
        "m4a" | "aac" => "audio/mp4",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Renders whole seconds as `m:ss`.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
