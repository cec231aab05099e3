use crate::{
    AudioError, CoreResult,
    analysis::{DEFAULT_BAR_COUNT, Extraction, SpectrumLayout, WaveformExtractor},
    audio::{
        AudioDecoder, InputDevice, Payload, PlaybackBackend, PlaybackEvent, SymphoniaDecoder,
    },
    composer::{
        CapturedAudio, Clip, ClipId, ClipLibrary, ClipOrigin, DEFAULT_SETTLE_DELAY, HostEvent,
        MicAction, MicAffordance, MicVisual, Notice, PendingClipStage, RecordingSession,
        SessionPhase, StartOutcome, UploadedFile,
    },
};

use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

use tracing::{debug, error, info, instrument, warn};

/// Tunables for a [`Composer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposerSettings {
    /// Bars per clip waveform.
    pub bar_count: usize,
    /// Live spectrum drawing area.
    pub layout: SpectrumLayout,
    /// Delay between the first mic activation and the automatic start.
    pub settle_delay: Duration,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            bar_count: DEFAULT_BAR_COUNT,
            layout: SpectrumLayout::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// The voice-message composer: recording, staging, library, and playback
/// wired together, with every observable change reported as a [`HostEvent`].
///
/// # Threading
///
/// Composer is driven from a single thread. The host calls [`Composer::on_frame`]
/// once per display frame. Waveform extraction is the only expensive step and
/// can be moved off that thread with the two-step pattern:
///
/// - [`Composer::stop_recording`] then [`Composer::complete_recording`]
/// - [`Composer::accept_upload`] then [`Composer::complete_upload`]
///
/// running [`WaveformExtractor::extract`] in between. The one-call variants
/// ([`Composer::finish_recording`], [`Composer::ingest_upload`]) extract inline.
pub struct Composer<D: InputDevice, P: PlaybackBackend, Dec: AudioDecoder = SymphoniaDecoder> {
    session: RecordingSession<D>,
    backend: P,
    extractor: WaveformExtractor<Dec>,
    stage: PendingClipStage,
    library: ClipLibrary,
    mic: MicAffordance,
    events: Sender<HostEvent>,
    level: f32,
    staging_visible: bool,
    computing: bool,
    menu_open: bool,
}

impl<D: InputDevice, P: PlaybackBackend, Dec: AudioDecoder> Composer<D, P, Dec> {
    /// Creates an idle composer reporting to `events`.
    pub fn new(
        device: D,
        backend: P,
        decoder: Dec,
        settings: ComposerSettings,
        events: Sender<HostEvent>,
    ) -> Self {
        info!(
            bar_count = settings.bar_count,
            settle_ms = settings.settle_delay.as_millis(),
            "Composer initialized"
        );
        Self {
            session: RecordingSession::new(device, settings.layout),
            backend,
            extractor: WaveformExtractor::new(decoder, settings.bar_count),
            stage: PendingClipStage::new(),
            library: ClipLibrary::new(),
            mic: MicAffordance::new(settings.settle_delay),
            events,
            level: 0.0,
            staging_visible: false,
            computing: false,
            menu_open: false,
        }
    }

    /// Recording session state.
    pub fn session(&self) -> &RecordingSession<D> {
        &self.session
    }

    /// The pending slot.
    pub fn stage(&self) -> &PendingClipStage {
        &self.stage
    }

    /// Committed clips.
    pub fn library(&self) -> &ClipLibrary {
        &self.library
    }

    /// Mic affordance state.
    pub fn mic(&self) -> &MicAffordance {
        &self.mic
    }

    /// Playback backend.
    pub fn backend(&self) -> &P {
        &self.backend
    }

    #[cfg(test)]
    pub(crate) fn backend_mut(&mut self) -> &mut P {
        &mut self.backend
    }

    /// Extractor to clone for off-thread waveform work.
    pub fn extractor(&self) -> &WaveformExtractor<Dec> {
        &self.extractor
    }

    /// Last live volume level, 0 when not capturing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether a session is capturing.
    pub fn is_recording(&self) -> bool {
        self.session.is_capturing()
    }

    /// Whether the staging surface has been revealed.
    pub fn staging_visible(&self) -> bool {
        self.staging_visible
    }

    /// Whether a waveform is being computed for an incoming clip.
    pub fn is_computing(&self) -> bool {
        self.computing
    }

    /// Whether the attachment menu is open.
    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    /// Opens or closes the attachment menu.
    pub fn toggle_menu(&mut self) -> bool {
        self.menu_open = !self.menu_open;
        self.menu_open
    }

    /// Handles a press of the mic affordance.
    ///
    /// Returns the captured audio when the press stopped a recording; the
    /// caller must then complete it (see [`Composer::complete_recording`]).
    /// Use [`Composer::activate_mic_and_finish`] to complete inline.
    #[instrument(skip(self, now))]
    pub fn activate_mic(&mut self, now: Instant) -> Option<CapturedAudio> {
        match self.mic.activate(now) {
            MicAction::RevealStaging => {
                self.staging_visible = true;
                self.emit(HostEvent::StagingRevealed);
                None
            }
            MicAction::StartRecording => {
                self.start_recording(now);
                None
            }
            MicAction::StopRecording => self.stop_recording(),
            MicAction::None => None,
        }
    }

    /// Mic press that completes a stopped recording inline.
    pub fn activate_mic_and_finish(&mut self, now: Instant) -> Option<ClipId> {
        let captured = self.activate_mic(now)?;
        let extraction = self.extractor.extract(captured.payload.bytes());
        Some(self.complete_recording(captured, extraction))
    }

    /// Advances timers, live analysis, and playback progress for one frame.
    pub fn on_frame(&mut self, now: Instant) {
        // An armed mic waits out a finalizing recording and starts after it.
        if self.session.phase() != SessionPhase::Finalizing
            && self.mic.poll(now) == MicAction::StartRecording
        {
            self.start_recording(now);
        }

        let update = self.session.on_frame(now);
        if let Some(snapshot) = update.snapshot {
            self.level = snapshot.level;
            self.emit(HostEvent::LevelChanged(snapshot.level));
            self.emit(HostEvent::SpectrumChanged(snapshot.bars));
            self.emit(HostEvent::MicVisualChanged(self.mic.visual(self.level)));
        }
        if let Some(seconds) = update.elapsed {
            self.emit(HostEvent::ElapsedChanged(seconds));
        }

        self.pump_playback();
    }

    /// Opens a recording session. Returns whether a new capture began.
    ///
    /// A device failure is reported as [`Notice::MicrophoneUnavailable`] and
    /// leaves the composer unchanged.
    #[instrument(skip(self, now))]
    pub fn start_recording(&mut self, now: Instant) -> bool {
        match self.session.start(now) {
            Ok(StartOutcome::Started) => {
                self.mic.on_started();
                self.emit(HostEvent::RecordingChanged(true));
                self.emit(HostEvent::ElapsedChanged(0));
                self.emit(HostEvent::MicVisualChanged(self.mic.visual(0.0)));
                true
            }
            Ok(StartOutcome::AlreadyActive) => {
                if self.session.is_capturing() {
                    self.mic.on_started();
                }
                false
            }
            Err(e) => {
                warn!(error = %e, "Microphone unavailable");
                self.mic.on_start_failed();
                if matches!(
                    e,
                    AudioError::DeviceUnavailable { .. } | AudioError::DeviceError { .. }
                ) {
                    self.emit(HostEvent::Notice(Notice::MicrophoneUnavailable));
                }
                false
            }
        }
    }

    /// Closes the recording session and hands back the captured audio.
    ///
    /// # Two-Step Pattern
    ///
    /// Extract the waveform from the returned payload, then call
    /// [`Composer::complete_recording`].
    #[instrument(skip(self))]
    pub fn stop_recording(&mut self) -> Option<CapturedAudio> {
        if !self.session.is_capturing() {
            return None;
        }

        let result = self.session.stop();
        self.mic.on_stopped();
        self.level = 0.0;
        self.emit(HostEvent::RecordingChanged(false));
        self.emit(HostEvent::LevelChanged(0.0));
        self.emit(HostEvent::MicVisualChanged(MicVisual::INERT));

        match result {
            Ok(Some(captured)) => {
                self.computing = true;
                self.emit(HostEvent::WaveformComputing);
                Some(captured)
            }
            Ok(None) => None,
            Err(e) => {
                error!(error = %e, "Recording could not be finalized");
                None
            }
        }
    }

    /// Builds the recorded clip from `captured` and stages it.
    pub fn complete_recording(&mut self, captured: CapturedAudio, extraction: Extraction) -> ClipId {
        let clip = self
            .session
            .finalize(&mut self.backend, captured, extraction);
        self.stage_clip(clip)
    }

    /// Stops recording and stages the clip in one call.
    pub fn finish_recording(&mut self) -> Option<ClipId> {
        let captured = self.stop_recording()?;
        let extraction = self.extractor.extract(captured.payload.bytes());
        Some(self.complete_recording(captured, extraction))
    }

    /// Validates an upload. Non-audio files raise [`Notice::OnlyAudioAllowed`]
    /// and change nothing.
    ///
    /// # Two-Step Pattern
    ///
    /// When this returns `true`, extract the waveform from the file's bytes,
    /// then call [`Composer::complete_upload`].
    #[instrument(skip(self, file), fields(name = %file.name, mime = %file.mime))]
    pub fn accept_upload(&mut self, file: &UploadedFile) -> bool {
        if let Err(e) = file.ensure_audio() {
            warn!(error = %e, "Upload rejected");
            self.emit(HostEvent::Notice(Notice::OnlyAudioAllowed));
            return false;
        }
        self.computing = true;
        self.emit(HostEvent::WaveformComputing);
        true
    }

    /// Stages an accepted upload and closes the attachment menu.
    pub fn complete_upload(&mut self, file: UploadedFile, extraction: Extraction) -> ClipId {
        let payload = Payload::new(file.bytes, file.mime);
        let playable = self.backend.create_playable(&payload);
        let clip = Clip::new(
            ClipOrigin::Uploaded,
            file.name,
            payload,
            playable,
            extraction.duration,
            extraction.waveform,
        );
        self.menu_open = false;
        self.stage_clip(clip)
    }

    /// Validates, extracts, and stages an upload in one call.
    pub fn ingest_upload(&mut self, file: UploadedFile) -> Option<ClipId> {
        if !self.accept_upload(&file) {
            return None;
        }
        let extraction = self.extractor.extract(&file.bytes);
        Some(self.complete_upload(file, extraction))
    }

    /// Gives up on a waveform computation that will never complete. A
    /// recording left finalizing returns to idle.
    pub fn abandon_computing(&mut self) {
        if !self.computing {
            return;
        }
        self.session.abandon_finalizing();
        self.computing = false;
        warn!("Waveform computation abandoned");
    }

    /// Plays the pending clip from the start, or stops it.
    pub fn toggle_pending_playback(&mut self) -> CoreResult<()> {
        let result = self.stage.toggle_playback(&mut self.backend);
        self.report_playback(&result);
        self.emit(HostEvent::PendingProgress(self.stage.progress()));
        result
    }

    /// Seeks the pending clip while it plays.
    pub fn seek_pending(&mut self, progress: f32) {
        self.stage.seek(&mut self.backend, progress);
        self.emit(HostEvent::PendingProgress(self.stage.progress()));
    }

    /// Throws away the pending clip.
    pub fn discard_pending(&mut self) -> Option<ClipId> {
        let discarded = self.stage.discard(&mut self.backend)?;
        self.emit(HostEvent::PendingChanged(None));
        Some(discarded)
    }

    /// Commits the pending clip to the library and requests the hand-off.
    /// No-op when nothing is pending.
    #[instrument(skip(self))]
    pub fn send_pending(&mut self) -> Option<ClipId> {
        let id = self.stage.commit(&mut self.backend, &mut self.library)?;
        self.emit(HostEvent::PendingChanged(None));
        self.emit(HostEvent::LibraryChanged);
        if let Some(clip) = self.library.get(id) {
            self.emit(HostEvent::CommitRequested(clip.clone()));
        }
        Some(id)
    }

    /// Plays library clip `id` from the start, or stops it.
    pub fn toggle_playback(&mut self, id: ClipId) -> CoreResult<()> {
        let previous = self.library.playing();
        let result = self.library.toggle_playback(&mut self.backend, id);
        self.report_playback(&result);

        if let Some(stopped) = previous.filter(|p| self.library.playing() != Some(*p)) {
            self.emit(HostEvent::PlaybackProgress {
                clip: stopped,
                progress: 0.0,
            });
        }
        if self.library.playing() == Some(id) {
            self.emit(HostEvent::PlaybackProgress {
                clip: id,
                progress: self.library.progress_of(id),
            });
        }
        result
    }

    /// Seeks the playing library clip.
    pub fn seek_playback(&mut self, progress: f32) {
        self.library.seek(&mut self.backend, progress);
        if let Some(id) = self.library.playing() {
            self.emit(HostEvent::PlaybackProgress {
                clip: id,
                progress: self.library.progress_of(id),
            });
        }
    }

    /// Removes library clip `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: ClipId) -> Option<Clip> {
        let was_playing = self.library.playing() == Some(id);
        let removed = self.library.remove(&mut self.backend, id)?;
        if was_playing {
            self.emit(HostEvent::PlaybackProgress {
                clip: id,
                progress: 0.0,
            });
        }
        self.emit(HostEvent::LibraryChanged);
        Some(removed)
    }

    /// Releases the device, stops all playback, and revokes every reference.
    #[instrument(skip(self))]
    pub fn teardown(&mut self) {
        let was_recording = self.session.is_capturing();
        self.session.teardown();
        self.session.abandon_finalizing();
        self.stage.discard(&mut self.backend);
        self.library.clear(&mut self.backend);
        self.computing = false;
        self.level = 0.0;
        if was_recording {
            self.emit(HostEvent::RecordingChanged(false));
        }
        debug!("Composer torn down");
    }

    fn stage_clip(&mut self, clip: Clip) -> ClipId {
        let id = clip.id();
        self.stage.stage(&mut self.backend, clip);
        self.computing = false;
        if !self.staging_visible {
            self.staging_visible = true;
            self.emit(HostEvent::StagingRevealed);
        }
        self.emit(HostEvent::PendingChanged(Some(id)));
        id
    }

    /// Routes backend notifications to whichever transport owns them.
    fn pump_playback(&mut self) {
        for event in self.backend.drain_events() {
            if let Some(transport) = self.stage.transport_mut()
                && transport.handle_event(&event)
            {
                self.emit(HostEvent::PendingProgress(self.stage.progress()));
                continue;
            }

            let playing = self.library.playing();
            if self.library.transport_mut().handle_event(&event)
                && let Some(id) = playing
            {
                let progress = match event {
                    PlaybackEvent::Ended { .. } => 0.0,
                    PlaybackEvent::Position { .. } => self.library.progress_of(id),
                };
                self.emit(HostEvent::PlaybackProgress { clip: id, progress });
            }
        }
    }

    fn report_playback(&self, result: &CoreResult<()>) {
        if result.is_err() {
            self.emit(HostEvent::Notice(Notice::PlaybackFailed));
        }
    }

    fn emit(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            debug!("Host event dropped, receiver closed");
        }
    }
}

impl<D: InputDevice, P: PlaybackBackend, Dec: AudioDecoder> Drop for Composer<D, P, Dec> {
    fn drop(&mut self) {
        self.teardown();
    }
}
