//! Microphone recording lifecycle: `Idle -> Capturing -> Finalizing -> Idle`.

use crate::{
    CoreResult,
    analysis::{Extraction, LiveAnalysisLoop, LiveSnapshot, SpectrumLayout},
    audio::{ChunkRecorder, DeviceHandle, InputDevice, Payload, PlaybackBackend},
    composer::{Clip, ClipOrigin},
};

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info, instrument};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Whole seconds since capture began, advanced once per elapsed second.
#[derive(Debug, Clone, Copy)]
pub struct ElapsedCounter {
    next_tick: Instant,
    seconds: u64,
}

impl ElapsedCounter {
    /// Counter at zero whose first increment is due one second after `now`.
    pub fn start(now: Instant) -> Self {
        Self {
            next_tick: now + ONE_SECOND,
            seconds: 0,
        }
    }

    /// Applies every increment due by `now`; returns the new value if it moved.
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        let before = self.seconds;
        while now >= self.next_tick {
            self.seconds += 1;
            self.next_tick += ONE_SECOND;
        }
        (self.seconds != before).then_some(self.seconds)
    }

    /// Whole elapsed seconds.
    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

/// Audio handed from `stop` to `finalize`.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    /// Concatenated capture as a WAV payload.
    pub payload: Payload,
    /// Length of the capture.
    pub duration: Duration,
    /// Wall-clock time the capture stopped.
    pub captured_at: DateTime<Local>,
}

impl CapturedAudio {
    /// Display name derived from the stop time.
    pub fn clip_name(&self) -> String {
        format!("Recording {}", self.captured_at.format("%H:%M:%S"))
    }
}

/// Observable session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No device open.
    Idle,
    /// Device open, data buffering, analysis running.
    Capturing,
    /// Device released, clip being built.
    Finalizing,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new capture began.
    Started,
    /// A session was already open; nothing changed.
    AlreadyActive,
}

/// Output of one frame while capturing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameUpdate {
    /// Analysis tick result, when a tick ran.
    pub snapshot: Option<LiveSnapshot>,
    /// New elapsed seconds, when the counter advanced.
    pub elapsed: Option<u64>,
}

struct ActiveCapture<H> {
    handle: H,
    recorder: ChunkRecorder,
    analysis: LiveAnalysisLoop,
    elapsed: ElapsedCounter,
}

impl<H: DeviceHandle> ActiveCapture<H> {
    fn drain_into_recorder(&mut self) {
        if let Some(chunk) = self.handle.take_chunk() {
            self.recorder.push(&chunk);
        }
    }

    /// Flushes buffered data, cancels the analysis loop and counter, and
    /// releases the device. Shared by stop and teardown.
    fn shut_down(mut self) -> ChunkRecorder {
        self.drain_into_recorder();
        self.analysis.cancel();
        self.handle.release();
        self.drain_into_recorder();
        debug!(
            sample_count = self.recorder.sample_count(),
            elapsed_secs = self.elapsed.seconds(),
            "Capture shut down"
        );
        self.recorder
    }
}

enum SessionState<H> {
    Idle,
    Capturing(ActiveCapture<H>),
    Finalizing,
}

/// Owns the microphone while capturing. At most one capture is open.
pub struct RecordingSession<D: InputDevice> {
    device: D,
    layout: SpectrumLayout,
    state: SessionState<D::Handle>,
}

impl<D: InputDevice> RecordingSession<D> {
    /// Idle session over `device`, drawing live bars into `layout`.
    pub fn new(device: D, layout: SpectrumLayout) -> Self {
        Self {
            device,
            layout,
            state: SessionState::Idle,
        }
    }

    /// Observable phase.
    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Capturing(_) => SessionPhase::Capturing,
            SessionState::Finalizing => SessionPhase::Finalizing,
        }
    }

    /// Whether the device is open and buffering.
    pub fn is_capturing(&self) -> bool {
        self.phase() == SessionPhase::Capturing
    }

    /// Elapsed whole seconds of the open capture.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        match &self.state {
            SessionState::Capturing(active) => Some(active.elapsed.seconds()),
            _ => None,
        }
    }

    /// Whether the live analysis loop has a tick pending.
    pub fn is_analysing(&self) -> bool {
        match &self.state {
            SessionState::Capturing(active) => active.analysis.is_scheduled(),
            _ => false,
        }
    }

    /// The input device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Opens the device and begins buffering, analysis, and the elapsed
    /// counter. A session that is not idle is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AudioError::DeviceUnavailable`] when the device
    /// cannot be acquired; the session stays idle.
    #[instrument(skip(self, now))]
    pub fn start(&mut self, now: Instant) -> CoreResult<StartOutcome> {
        if !matches!(self.state, SessionState::Idle) {
            debug!(phase = ?self.phase(), "Start ignored, session already open");
            return Ok(StartOutcome::AlreadyActive);
        }

        let handle = self.device.acquire()?;
        let recorder = ChunkRecorder::begin(handle.sample_rate());
        let mut analysis = LiveAnalysisLoop::new(self.layout);
        analysis.start();

        info!(sample_rate = handle.sample_rate(), "Recording started");

        self.state = SessionState::Capturing(ActiveCapture {
            handle,
            recorder,
            analysis,
            elapsed: ElapsedCounter::start(now),
        });

        Ok(StartOutcome::Started)
    }

    /// Moves delivered data into the capture, advances the counter, and runs
    /// the pending analysis tick.
    pub fn on_frame(&mut self, now: Instant) -> FrameUpdate {
        let SessionState::Capturing(active) = &mut self.state else {
            return FrameUpdate::default();
        };

        active.drain_into_recorder();
        let elapsed = active.elapsed.poll(now);
        let snapshot = active.analysis.run_frame(Some(&active.handle));

        FrameUpdate { snapshot, elapsed }
    }

    /// Releases the device and produces the captured payload, entering
    /// `Finalizing`. Returns `None` when nothing was capturing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AudioError::EncodeError`] if the payload cannot be
    /// built; the session returns to idle with the device released.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> CoreResult<Option<CapturedAudio>> {
        if !self.is_capturing() {
            return Ok(None);
        }
        let SessionState::Capturing(active) =
            std::mem::replace(&mut self.state, SessionState::Finalizing)
        else {
            return Ok(None);
        };

        let recorder = active.shut_down();
        let duration = recorder.duration();

        let payload = match recorder.finish() {
            Ok(payload) => payload,
            Err(e) => {
                self.state = SessionState::Idle;
                return Err(e);
            }
        };

        info!(duration_ms = duration.as_millis(), "Recording stopped");

        Ok(Some(CapturedAudio {
            payload,
            duration,
            captured_at: Local::now(),
        }))
    }

    /// Builds the recorded clip and returns the session to idle.
    pub fn finalize<P: PlaybackBackend>(
        &mut self,
        backend: &mut P,
        captured: CapturedAudio,
        extraction: Extraction,
    ) -> Clip {
        let playable = backend.create_playable(&captured.payload);
        let clip = Clip::new(
            ClipOrigin::Recorded,
            captured.clip_name(),
            captured.payload,
            playable,
            Some(captured.duration),
            extraction.waveform,
        );

        if matches!(self.state, SessionState::Finalizing) {
            self.state = SessionState::Idle;
        }
        info!(clip_id = %clip.id(), name = clip.name(), "Recording finalized");
        clip
    }

    /// Leaves `Finalizing` without producing a clip.
    pub fn abandon_finalizing(&mut self) {
        if matches!(self.state, SessionState::Finalizing) {
            debug!("Finalizing abandoned");
            self.state = SessionState::Idle;
        }
    }

    /// Runs the stop release sequence without producing a clip.
    pub fn teardown(&mut self) {
        if let SessionState::Capturing(active) =
            std::mem::replace(&mut self.state, SessionState::Idle)
        {
            let recorder = active.shut_down();
            debug!(discarded_samples = recorder.sample_count(), "Recording torn down");
        }
    }
}

impl<D: InputDevice> Drop for RecordingSession<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
