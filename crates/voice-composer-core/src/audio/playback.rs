//! Playback capability and its cpal output implementation.
//!
//! A [`PlayableRef`] is an opaque handle derived from a payload, the way an
//! object URL is derived from a blob. It stays valid until revoked.

use crate::{
    AudioError, CoreResult,
    audio::{AudioDecoder, Payload, Resampler, SymphoniaDecoder},
};

use std::{
    collections::HashMap,
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use cpal::{
    Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Opaque reference to a playable payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayableRef(u64);

impl PlayableRef {
    /// Builds a reference from a backend-assigned number.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Backend-assigned number.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Notification produced by a playback backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    /// The playback position of `playable` changed.
    Position {
        /// Reference whose position moved.
        playable: PlayableRef,
        /// Current position.
        position: Duration,
        /// Total length, zero while unknown.
        duration: Duration,
    },
    /// `playable` reached its end and stopped by itself.
    Ended {
        /// Reference that finished.
        playable: PlayableRef,
    },
}

impl PlaybackEvent {
    /// Reference the event is about.
    pub fn playable(&self) -> PlayableRef {
        match self {
            PlaybackEvent::Position { playable, .. } | PlaybackEvent::Ended { playable } => {
                *playable
            }
        }
    }
}

/// Playback capability shared by the pending stage and the library.
pub trait PlaybackBackend {
    /// Derives a playable reference from a payload. Never fails; a payload
    /// that cannot be played fails at [`PlaybackBackend::play`].
    fn create_playable(&mut self, payload: &Payload) -> PlayableRef;

    /// Starts or resumes playback from the current position.
    fn play(&mut self, playable: PlayableRef) -> CoreResult<()>;

    /// Pauses playback, keeping the position.
    fn pause(&mut self, playable: PlayableRef);

    /// Moves the position to `progress` (0..=1) of the total length.
    fn seek(&mut self, playable: PlayableRef, progress: f32);

    /// Position and end notifications accumulated since the last call.
    fn drain_events(&mut self) -> Vec<PlaybackEvent>;

    /// Invalidates the reference and frees everything bound to it.
    fn revoke(&mut self, playable: PlayableRef);
}

/// Decoded samples shared with the output callback.
struct Track {
    samples: Vec<f32>,
    sample_rate: u32,
    position: AtomicUsize,
    finished: AtomicBool,
}

impl Track {
    fn duration_of(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

struct Playable {
    payload: Payload,
    track: Option<Arc<Track>>,
    stream: Option<Stream>,
    last_reported: Option<usize>,
}

/// Plays clips through the default cpal output device.
///
/// Each playing reference owns one output stream; pausing drops it.
pub struct CpalPlayback<D = SymphoniaDecoder> {
    decoder: D,
    next_id: u64,
    playables: HashMap<PlayableRef, Playable>,
}

impl Default for CpalPlayback<SymphoniaDecoder> {
    fn default() -> Self {
        Self::new(SymphoniaDecoder)
    }
}

impl<D: AudioDecoder> CpalPlayback<D> {
    /// Creates a backend decoding payloads with `decoder`.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            next_id: 1,
            playables: HashMap::new(),
        }
    }

    /// Number of references not yet revoked.
    pub fn live_references(&self) -> usize {
        self.playables.len()
    }

    #[track_caller]
    fn load_track(decoder: &D, payload: &Payload, output_rate: u32) -> CoreResult<Track> {
        let decoded = decoder.decode(payload.bytes())?;
        let mono: Vec<f32> = decoded.first_channel().to_vec();

        let samples = if decoded.sample_rate != output_rate && !mono.is_empty() {
            Resampler::new(decoded.sample_rate, output_rate)?.process(&mono)?
        } else {
            mono
        };

        Ok(Track {
            samples,
            sample_rate: output_rate,
            position: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        })
    }

    #[track_caller]
    fn open_stream(track: Arc<Track>) -> CoreResult<(Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::PlaybackError {
                reason: "No output device found".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| AudioError::PlaybackError {
                reason: format!("Failed to get output config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .into();
        let channels = usize::from(config.channels).max(1);
        let rate = config.sample_rate;

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut position = track.position.load(Ordering::Acquire);
                    for frame in out.chunks_mut(channels) {
                        let sample = track.samples.get(position).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if position < track.samples.len() {
                            position += 1;
                        }
                    }
                    track.position.store(position, Ordering::Release);
                    if position >= track.samples.len() {
                        track.finished.store(true, Ordering::Release);
                    }
                },
                |err| {
                    error!("Playback stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::PlaybackError {
                reason: format!("Failed to build output stream: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok((stream, rate))
    }
}

impl<D: AudioDecoder> PlaybackBackend for CpalPlayback<D> {
    fn create_playable(&mut self, payload: &Payload) -> PlayableRef {
        let playable = PlayableRef(self.next_id);
        self.next_id += 1;
        self.playables.insert(
            playable,
            Playable {
                payload: payload.clone(),
                track: None,
                stream: None,
                last_reported: None,
            },
        );
        debug!(playable = playable.0, mime = payload.mime(), "Playable created");
        playable
    }

    #[track_caller]
    #[instrument(skip(self))]
    fn play(&mut self, playable: PlayableRef) -> CoreResult<()> {
        let entry = self
            .playables
            .get_mut(&playable)
            .ok_or(AudioError::PlaybackError {
                reason: format!("Playable {} was revoked", playable.0),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if entry.stream.is_some() {
            return Ok(());
        }

        let track = match &entry.track {
            Some(track) => Arc::clone(track),
            None => {
                // Output rate is only known once the device is opened, so the
                // first play decodes at the device default and caches it.
                let output_rate = cpal::default_host()
                    .default_output_device()
                    .and_then(|d| d.default_output_config().ok())
                    .map(|c| c.sample_rate())
                    .ok_or(AudioError::PlaybackError {
                        reason: "No output device found".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    })?;
                let track = Arc::new(Self::load_track(&self.decoder, &entry.payload, output_rate)?);
                entry.track = Some(Arc::clone(&track));
                track
            }
        };

        if track.finished.load(Ordering::Acquire) {
            track.position.store(0, Ordering::Release);
            track.finished.store(false, Ordering::Release);
        }

        let (stream, rate) = Self::open_stream(Arc::clone(&track))?;
        if rate != track.sample_rate {
            warn!(
                device_rate = rate,
                track_rate = track.sample_rate,
                "Output rate changed since decode, playback speed will differ"
            );
        }

        stream.play().map_err(|e| AudioError::PlaybackError {
            reason: format!("Failed to start output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        entry.stream = Some(stream);
        info!(playable = playable.0, "Playback started");
        Ok(())
    }

    fn pause(&mut self, playable: PlayableRef) {
        if let Some(entry) = self.playables.get_mut(&playable)
            && entry.stream.take().is_some()
        {
            debug!(playable = playable.0, "Playback paused");
        }
    }

    fn seek(&mut self, playable: PlayableRef, progress: f32) {
        let Some(track) = self.playables.get(&playable).and_then(|e| e.track.as_ref()) else {
            return;
        };
        let target = (progress.clamp(0.0, 1.0) * track.samples.len() as f32) as usize;
        track.position.store(target.min(track.samples.len()), Ordering::Release);
        track.finished.store(false, Ordering::Release);
    }

    fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();

        for (playable, entry) in &mut self.playables {
            let (Some(track), true) = (&entry.track, entry.stream.is_some()) else {
                continue;
            };

            let position = track.position.load(Ordering::Acquire);
            if entry.last_reported != Some(position) {
                entry.last_reported = Some(position);
                events.push(PlaybackEvent::Position {
                    playable: *playable,
                    position: track.duration_of(position),
                    duration: track.duration_of(track.samples.len()),
                });
            }

            if track.finished.load(Ordering::Acquire) {
                entry.stream = None;
                events.push(PlaybackEvent::Ended {
                    playable: *playable,
                });
            }
        }

        events
    }

    fn revoke(&mut self, playable: PlayableRef) {
        if self.playables.remove(&playable).is_some() {
            debug!(playable = playable.0, "Playable revoked");
        }
    }
}
