use crate::{
    CoreResult,
    audio::{PlayableRef, PlaybackBackend, PlaybackEvent},
    composer::ClipId,
};

use tracing::{debug, instrument, warn};

/// Transport state: nothing playing, or exactly one clip playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportState {
    /// Nothing is playing; progress is 0.
    Stopped,
    /// `clip` is playing through `playable`.
    Playing {
        /// Clip being played.
        clip: ClipId,
        /// Reference handed to the backend.
        playable: PlayableRef,
        /// Normalized position in `[0, 1]`.
        progress: f32,
    },
}

/// Single-clip play/stop/seek state machine for one scope.
///
/// At most one clip plays per transport; starting another first stops the
/// current one and rewinds it.
#[derive(Debug, Clone)]
pub struct PlaybackTransport {
    state: TransportState,
}

impl Default for PlaybackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackTransport {
    /// Transport that is not playing anything.
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
        }
    }

    /// Current state.
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Clip currently playing, if any.
    pub fn playing(&self) -> Option<ClipId> {
        match self.state {
            TransportState::Playing { clip, .. } => Some(clip),
            TransportState::Stopped => None,
        }
    }

    /// Progress of the playing clip, 0 when stopped.
    pub fn progress(&self) -> f32 {
        match self.state {
            TransportState::Playing { progress, .. } => progress,
            TransportState::Stopped => 0.0,
        }
    }

    /// Progress of `clip`: its position when playing, otherwise 0.
    pub fn progress_of(&self, clip: ClipId) -> f32 {
        match self.state {
            TransportState::Playing {
                clip: playing,
                progress,
                ..
            } if playing == clip => progress,
            _ => 0.0,
        }
    }

    /// Stops `clip` if it is playing, otherwise stops whatever plays and
    /// starts `clip` from the beginning.
    ///
    /// If the backend refuses to start, the transport stays stopped.
    #[instrument(skip(self, backend))]
    pub fn toggle<P: PlaybackBackend>(
        &mut self,
        backend: &mut P,
        clip: ClipId,
        playable: PlayableRef,
    ) -> CoreResult<()> {
        if self.playing() == Some(clip) {
            self.stop(backend);
            return Ok(());
        }

        self.stop(backend);

        backend.seek(playable, 0.0);
        if let Err(e) = backend.play(playable) {
            warn!(clip_id = %clip, error = %e, "Playback failed to start");
            return Err(e);
        }

        self.state = TransportState::Playing {
            clip,
            playable,
            progress: 0.0,
        };
        debug!(clip_id = %clip, "Playback started");
        Ok(())
    }

    /// Stops and rewinds whatever is playing. Returns the stopped clip.
    pub fn stop<P: PlaybackBackend>(&mut self, backend: &mut P) -> Option<ClipId> {
        let TransportState::Playing { clip, playable, .. } = self.state else {
            return None;
        };
        backend.pause(playable);
        backend.seek(playable, 0.0);
        self.state = TransportState::Stopped;
        debug!(clip_id = %clip, "Playback stopped");
        Some(clip)
    }

    /// Stops playback only if `clip` is the one playing.
    pub fn stop_if<P: PlaybackBackend>(&mut self, backend: &mut P, clip: ClipId) -> bool {
        if self.playing() == Some(clip) {
            self.stop(backend);
            return true;
        }
        false
    }

    /// Moves the playing clip to `progress`. Ignored while stopped.
    pub fn seek<P: PlaybackBackend>(&mut self, backend: &mut P, progress: f32) {
        if let TransportState::Playing {
            playable,
            progress: current,
            ..
        } = &mut self.state
        {
            let target = progress.clamp(0.0, 1.0);
            backend.seek(*playable, target);
            *current = target;
        }
    }

    /// Applies a backend notification. Returns whether the state changed.
    ///
    /// Reaching the end returns the transport to stopped with progress 0.
    pub fn handle_event(&mut self, event: &PlaybackEvent) -> bool {
        let TransportState::Playing {
            clip,
            playable,
            progress,
        } = &mut self.state
        else {
            return false;
        };
        if event.playable() != *playable {
            return false;
        }

        match *event {
            PlaybackEvent::Position {
                position, duration, ..
            } => {
                if duration.is_zero() {
                    return false;
                }
                *progress = (position.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0);
                true
            }
            PlaybackEvent::Ended { .. } => {
                debug!(clip_id = %clip, "Playback reached the end");
                self.state = TransportState::Stopped;
                true
            }
        }
    }
}
