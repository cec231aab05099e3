use crate::{
    CoreResult,
    audio::PlaybackBackend,
    composer::{Clip, ClipId, PlaybackTransport},
};

use tracing::{debug, info, warn};

/// Committed clips in insertion order, sharing one playback scope.
#[derive(Debug, Default)]
pub struct ClipLibrary {
    clips: Vec<Clip>,
    transport: PlaybackTransport,
}

impl ClipLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clips in insertion order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Number of clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clip with `id`, if listed.
    pub fn get(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id() == id)
    }

    /// Whether `id` is listed.
    pub fn contains(&self, id: ClipId) -> bool {
        self.get(id).is_some()
    }

    /// Clip currently playing in the library scope.
    pub fn playing(&self) -> Option<ClipId> {
        self.transport.playing()
    }

    /// Progress of `id`, 0 unless it is the playing clip.
    pub fn progress_of(&self, id: ClipId) -> f32 {
        self.transport.progress_of(id)
    }

    /// Appends `clip`. A clip whose id is already present is dropped, its
    /// reference released unless the listed clip shares it. Returns whether
    /// it was added.
    pub fn add<P: PlaybackBackend>(&mut self, backend: &mut P, clip: Clip) -> bool {
        if let Some(existing) = self.get(clip.id()) {
            warn!(clip_id = %clip.id(), "Duplicate clip id, dropping");
            if existing.playable() != clip.playable() {
                backend.revoke(clip.playable());
            }
            return false;
        }
        debug!(clip_id = %clip.id(), position = self.clips.len(), "Clip added to library");
        self.clips.push(clip);
        true
    }

    /// Removes `id`, stopping its playback and revoking its reference first.
    /// Unknown ids are ignored.
    pub fn remove<P: PlaybackBackend>(&mut self, backend: &mut P, id: ClipId) -> Option<Clip> {
        let index = self.clips.iter().position(|c| c.id() == id)?;
        self.transport.stop_if(backend, id);
        let clip = self.clips.remove(index);
        backend.revoke(clip.playable());
        info!(clip_id = %id, "Clip removed from library");
        Some(clip)
    }

    /// Plays `id` from the start, or stops it if it is already playing.
    /// Unknown ids are ignored.
    pub fn toggle_playback<P: PlaybackBackend>(
        &mut self,
        backend: &mut P,
        id: ClipId,
    ) -> CoreResult<()> {
        let Some(playable) = self.get(id).map(Clip::playable) else {
            return Ok(());
        };
        self.transport.toggle(backend, id, playable)
    }

    /// Seeks the playing clip.
    pub fn seek<P: PlaybackBackend>(&mut self, backend: &mut P, progress: f32) {
        self.transport.seek(backend, progress);
    }

    /// Stops playback and revokes every reference.
    pub fn clear<P: PlaybackBackend>(&mut self, backend: &mut P) {
        self.transport.stop(backend);
        for clip in self.clips.drain(..) {
            backend.revoke(clip.playable());
        }
    }

    pub(crate) fn transport_mut(&mut self) -> &mut PlaybackTransport {
        &mut self.transport
    }
}
