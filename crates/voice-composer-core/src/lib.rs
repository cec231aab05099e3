//! Voice Composer Core Library
//!
//! Client-side voice-message composition: microphone capture with live level
//! and spectrum analysis, fixed-length waveform summaries, a single pending
//! clip, a committed clip library, and one-at-a-time playback per scope.
//!
//! # Example
//!
//! ```no_run
//! use voice_composer_core::{
//!     Composer, ComposerSettings, CpalInputDevice, CpalPlayback, HostEvent, SymphoniaDecoder,
//! };
//!
//! use std::{sync::mpsc, thread::sleep, time::{Duration, Instant}};
//!
//! let (tx, rx) = mpsc::channel();
//! let mut composer = Composer::new(
//!     CpalInputDevice::new(None),
//!     CpalPlayback::default(),
//!     SymphoniaDecoder,
//!     ComposerSettings::default(),
//!     tx,
//! );
//!
//! composer.start_recording(Instant::now());
//! for _ in 0..180 {
//!     composer.on_frame(Instant::now());
//!     sleep(Duration::from_millis(16));
//! }
//! if let Some(id) = composer.finish_recording() {
//!     composer.toggle_pending_playback().ok();
//!     println!("Staged {id}");
//! }
//!
//! for event in rx.try_iter() {
//!     if let HostEvent::Notice(notice) = event {
//!         println!("{notice}");
//!     }
//! }
//! ```

mod analysis;
mod audio;
mod composer;
mod error;

pub use {
    analysis::{
        DEFAULT_BAR_COUNT, Extraction, LiveAnalysisLoop, LiveSnapshot, RenderedBar,
        SILENCE_FLOOR, SpectrumAnalyser, SpectrumBar, SpectrumLayout, Waveform,
        WaveformExtractor, compute_rms, layout_bars, summarize,
    },
    audio::{
        AudioDecoder, ChunkRecorder, CpalInputDevice, CpalInputHandle, CpalPlayback,
        DecodedAudio, DeviceHandle, InputDevice, Payload, PlayableRef, PlaybackBackend,
        PlaybackEvent, SymphoniaDecoder,
    },
    composer::{
        CapturedAudio, Clip, ClipId, ClipLibrary, ClipOrigin, Composer, ComposerSettings,
        DEFAULT_SETTLE_DELAY, ElapsedCounter, FrameUpdate, HostEvent, MicAction, MicAffordance,
        MicState, MicVisual, Notice, PendingClipStage, PlaybackTransport, RecordingSession,
        SessionPhase, StartOutcome, TransportState, UploadedFile, format_clock, mime_for_path,
    },
    error::AudioError,
    error::Result as CoreResult,
};
