use crate::{
    CoreResult,
    audio::PlaybackBackend,
    composer::{Clip, ClipId, ClipLibrary, PlaybackTransport},
};

use tracing::{debug, info, instrument};

/// The pending slot: empty, or one clip with its own transport.
///
/// The transport exists only while a clip is staged, so two pending
/// transports can never coexist.
#[derive(Debug, Default)]
enum PendingSlot {
    #[default]
    Empty,
    Staged {
        clip: Clip,
        transport: PlaybackTransport,
    },
}

/// Holds at most one clip awaiting discard or commit.
#[derive(Debug, Default)]
pub struct PendingClipStage {
    slot: PendingSlot,
}

impl PendingClipStage {
    /// Empty stage with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// The staged clip, if any.
    pub fn clip(&self) -> Option<&Clip> {
        match &self.slot {
            PendingSlot::Staged { clip, .. } => Some(clip),
            PendingSlot::Empty => None,
        }
    }

    /// Whether no clip is pending.
    pub fn is_empty(&self) -> bool {
        matches!(self.slot, PendingSlot::Empty)
    }

    /// Whether the staged clip is playing.
    pub fn is_playing(&self) -> bool {
        match &self.slot {
            PendingSlot::Staged { transport, .. } => transport.playing().is_some(),
            PendingSlot::Empty => false,
        }
    }

    /// Normalized progress of the staged clip, 0 when empty or stopped.
    pub fn progress(&self) -> f32 {
        match &self.slot {
            PendingSlot::Staged { transport, .. } => transport.progress(),
            PendingSlot::Empty => 0.0,
        }
    }

    /// Stages `clip`, first stopping and releasing any clip it supersedes.
    /// Returns the id of the replaced clip.
    #[instrument(skip(self, backend, clip), fields(clip_id = %clip.id()))]
    pub fn stage<P: PlaybackBackend>(&mut self, backend: &mut P, clip: Clip) -> Option<ClipId> {
        let replaced = self.discard(backend);
        info!(name = clip.name(), "Clip staged");
        self.slot = PendingSlot::Staged {
            clip,
            transport: PlaybackTransport::new(),
        };
        replaced
    }

    /// Stops the staged clip's playback, revokes its reference, and empties
    /// the slot.
    pub fn discard<P: PlaybackBackend>(&mut self, backend: &mut P) -> Option<ClipId> {
        let clip = self.detach(backend)?;
        backend.revoke(clip.playable());
        debug!(clip_id = %clip.id(), "Pending clip discarded");
        Some(clip.id())
    }

    /// Moves the staged clip into `library` and empties the slot. No-op when
    /// the slot is empty. Returns the committed clip's id.
    pub fn commit<P: PlaybackBackend>(
        &mut self,
        backend: &mut P,
        library: &mut ClipLibrary,
    ) -> Option<ClipId> {
        let clip = self.detach(backend)?;
        let id = clip.id();
        library.add(backend, clip);
        info!(clip_id = %id, "Pending clip committed");
        Some(id)
    }

    /// Starts the staged clip from the beginning, or stops it if playing.
    /// No-op when empty.
    pub fn toggle_playback<P: PlaybackBackend>(&mut self, backend: &mut P) -> CoreResult<()> {
        match &mut self.slot {
            PendingSlot::Staged { clip, transport } => {
                transport.toggle(backend, clip.id(), clip.playable())
            }
            PendingSlot::Empty => Ok(()),
        }
    }

    /// Seeks the staged clip while it plays.
    pub fn seek<P: PlaybackBackend>(&mut self, backend: &mut P, progress: f32) {
        if let PendingSlot::Staged { transport, .. } = &mut self.slot {
            transport.seek(backend, progress);
        }
    }

    pub(crate) fn transport_mut(&mut self) -> Option<&mut PlaybackTransport> {
        match &mut self.slot {
            PendingSlot::Staged { transport, .. } => Some(transport),
            PendingSlot::Empty => None,
        }
    }

    /// Pauses and drops the transport, handing the clip back untouched.
    fn detach<P: PlaybackBackend>(&mut self, backend: &mut P) -> Option<Clip> {
        match std::mem::take(&mut self.slot) {
            PendingSlot::Staged { clip, mut transport } => {
                transport.stop(backend);
                Some(clip)
            }
            PendingSlot::Empty => None,
        }
    }
}
