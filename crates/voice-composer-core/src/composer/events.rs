use crate::{
    analysis::SpectrumBar,
    composer::{Clip, ClipId, MicVisual},
};

use std::fmt;

/// Transient, dismissible message for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Microphone permission denied or no device.
    MicrophoneUnavailable,
    /// An upload was not an audio file.
    OnlyAudioAllowed,
    /// A clip could not be played.
    PlaybackFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Notice::MicrophoneUnavailable => {
                "Could not access microphone. Please check permissions."
            }
            Notice::OnlyAudioAllowed => "Only audio files allowed",
            Notice::PlaybackFailed => "Could not play this clip.",
        };
        f.write_str(text)
    }
}

/// Outbound notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A recording session opened (`true`) or closed (`false`).
    RecordingChanged(bool),
    /// New live volume level.
    LevelChanged(f32),
    /// New live spectrum bars.
    SpectrumChanged(Vec<SpectrumBar>),
    /// Elapsed recording time in whole seconds.
    ElapsedChanged(u64),
    /// The mic affordance's appearance changed.
    MicVisualChanged(MicVisual),
    /// The staging surface should become visible.
    StagingRevealed,
    /// A waveform is being computed; a pending clip follows.
    WaveformComputing,
    /// The pending clip changed (`None` when the slot emptied).
    PendingChanged(Option<ClipId>),
    /// Playback progress of the pending clip.
    PendingProgress(f32),
    /// Clips were added to or removed from the library.
    LibraryChanged,
    /// Playback progress of a library clip.
    PlaybackProgress {
        /// Clip the progress belongs to.
        clip: ClipId,
        /// Normalized progress.
        progress: f32,
    },
    /// A user-facing notice.
    Notice(Notice),
    /// The user sent a clip downstream.
    CommitRequested(Clip),
}
