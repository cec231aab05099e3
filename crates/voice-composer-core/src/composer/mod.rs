mod clip;
#[allow(clippy::module_inception)]
mod composer;
mod events;
mod library;
mod mic;
mod session;
mod stage;
mod transport;

pub use {
    clip::{Clip, ClipId, ClipOrigin, UploadedFile, format_clock, mime_for_path},
    composer::{Composer, ComposerSettings},
    events::{HostEvent, Notice},
    library::ClipLibrary,
    mic::{DEFAULT_SETTLE_DELAY, MicAction, MicAffordance, MicState, MicVisual},
    session::{
        CapturedAudio, ElapsedCounter, FrameUpdate, RecordingSession, SessionPhase, StartOutcome,
    },
    stage::PendingClipStage,
    transport::{PlaybackTransport, TransportState},
};
