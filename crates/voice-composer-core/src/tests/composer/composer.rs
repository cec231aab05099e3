use crate::{
    Composer, ComposerSettings, HostEvent, MicState, Notice, SILENCE_FLOOR, SessionPhase,
    SymphoniaDecoder, UploadedFile,
    tests::fakes::{
        DeviceTap, FakeInputDevice, FakePlayback, TEST_SAMPLE_RATE, flac_bytes, wav_bytes,
    },
};

use std::{
    sync::mpsc::{self, Receiver},
    time::{Duration, Instant},
};

const SETTLE: Duration = Duration::from_millis(500);

type TestComposer = Composer<FakeInputDevice, FakePlayback, SymphoniaDecoder>;

fn composer_with(
    device: FakeInputDevice,
    backend: FakePlayback,
) -> (TestComposer, DeviceTap, Receiver<HostEvent>) {
    let tap = device.tap();
    let (tx, rx) = mpsc::channel();
    let settings = ComposerSettings {
        settle_delay: SETTLE,
        ..ComposerSettings::default()
    };
    (Composer::new(device, backend, SymphoniaDecoder, settings, tx), tap, rx)
}

fn composer() -> (TestComposer, DeviceTap, Receiver<HostEvent>) {
    composer_with(FakeInputDevice::new(), FakePlayback::new())
}

fn wav_upload(name: &str) -> UploadedFile {
    UploadedFile::new(name, "audio/wav", wav_bytes(&[0.2, -0.4, 0.8], TEST_SAMPLE_RATE))
}

/// WHAT: Record 3s of silence, commit, play to the end
/// WHY: Exercises the full mic -> pending -> library -> playback path
#[test]
fn given_three_seconds_of_silence_when_recorded_and_sent_then_library_plays_it() {
    // Given: A composer with a working device
    let (mut composer, tap, rx) = composer();
    let t0 = Instant::now();

    // When: Arming the mic, letting it settle, and capturing 3s of silence
    composer.activate_mic(t0);
    let started_at = t0 + SETTLE;
    composer.on_frame(started_at);
    assert!(composer.is_recording());
    assert_eq!(composer.mic().state(), MicState::Listening);
    for second in 1..=3 {
        tap.deliver(vec![0.0; TEST_SAMPLE_RATE as usize]);
        composer.on_frame(started_at + Duration::from_secs(second));
    }
    let captured = composer.activate_mic(started_at + Duration::from_secs(3)).unwrap();
    let extraction = composer.extractor().extract(captured.payload.bytes());
    let id = composer.complete_recording(captured, extraction);

    // Then: The pending clip has 50 floor bars and a timestamped name
    let pending = composer.stage().clip().unwrap().clone();
    assert_eq!(pending.id(), id);
    assert_eq!(pending.waveform().bars(), vec![SILENCE_FLOOR; 50].as_slice());
    assert!(pending.name().starts_with("Recording "));
    assert_eq!(pending.name().matches(':').count(), 2);
    assert_eq!(pending.duration(), Some(Duration::from_secs(3)));
    assert_eq!(tap.open_handles(), 0);

    // When: Sending it
    assert_eq!(composer.send_pending(), Some(id));

    // Then: Library has it under the same name and the slot is empty
    assert!(composer.stage().is_empty());
    assert_eq!(composer.library().len(), 1);
    assert_eq!(composer.library().clips()[0].name(), pending.name());

    // When: Playing it through to the end
    composer.toggle_playback(id).unwrap();
    assert_eq!(composer.library().progress_of(id), 0.0);
    let playable = pending.playable();
    composer.backend_mut().emit_position(playable, 3.0, 3.0);
    composer.on_frame(started_at + Duration::from_secs(5));
    let at_end = composer.library().progress_of(id);
    composer.backend_mut().emit_ended(playable);
    composer.on_frame(started_at + Duration::from_secs(6));

    // Then: Progress reached 1 and then reset to 0
    assert!((at_end - 1.0).abs() < f32::EPSILON);
    assert_eq!(composer.library().playing(), None);
    assert_eq!(composer.library().progress_of(id), 0.0);

    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert_eq!(events[0], HostEvent::StagingRevealed);
    assert!(events.contains(&HostEvent::RecordingChanged(true)));
    assert!(events.contains(&HostEvent::RecordingChanged(false)));
    assert!(events.contains(&HostEvent::ElapsedChanged(3)));
    assert!(events.contains(&HostEvent::WaveformComputing));
    assert!(events.contains(&HostEvent::PendingChanged(Some(id))));
    assert!(events.contains(&HostEvent::CommitRequested(pending.clone())));
    assert!(events.contains(&HostEvent::PlaybackProgress {
        clip: id,
        progress: 1.0
    }));
    assert_eq!(
        events.last(),
        Some(&HostEvent::PlaybackProgress {
            clip: id,
            progress: 0.0
        })
    );
}

/// WHAT: A denied microphone shows a notice and returns the mic to dormant
/// WHY: Permission failures are non-fatal and leave no half-open state
#[test]
fn given_denied_microphone_when_auto_start_fires_then_notice_and_dormant() {
    // Given: A composer whose device refuses access, mic armed
    let (mut composer, _tap, rx) =
        composer_with(FakeInputDevice::denied(), FakePlayback::new());
    let t0 = Instant::now();
    composer.activate_mic(t0);

    // When: The settle delay elapses
    composer.on_frame(t0 + SETTLE);

    // Then: Notice raised, not recording, mic dormant again
    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert!(events.contains(&HostEvent::Notice(Notice::MicrophoneUnavailable)));
    assert!(!events.contains(&HostEvent::RecordingChanged(true)));
    assert!(!composer.is_recording());
    assert_eq!(composer.mic().state(), MicState::Dormant);
    assert_eq!(
        Notice::MicrophoneUnavailable.to_string(),
        "Could not access microphone. Please check permissions."
    );
}

/// WHAT: A stream that fails after the device is found reports the same notice
/// WHY: Any failure to open the microphone must leave the mic usable again
#[test]
fn given_broken_device_stream_when_auto_start_fires_then_notice_and_dormant() {
    // Given: A composer whose device is found but cannot stream, mic armed
    let (mut composer, tap, rx) = composer_with(FakeInputDevice::broken(), FakePlayback::new());
    let t0 = Instant::now();
    composer.activate_mic(t0);

    // When: The settle delay elapses
    composer.on_frame(t0 + SETTLE);

    // Then: Notice raised, nothing held open, mic dormant again
    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert!(events.contains(&HostEvent::Notice(Notice::MicrophoneUnavailable)));
    assert!(!composer.is_recording());
    assert_eq!(tap.open_handles(), 0);
    assert_eq!(composer.mic().state(), MicState::Dormant);
}

/// WHAT: Non-audio uploads never create a pending clip, reveal staging, or close the menu
/// WHY: Rejected files must not change any state
#[test]
fn given_text_file_when_uploading_then_rejected_without_state_change() {
    // Given: A composer with the attachment menu open
    let (mut composer, _tap, rx) = composer();
    assert!(composer.toggle_menu());
    let file = UploadedFile::new("notes.txt", "text/plain", b"hello".to_vec());

    // When: Uploading a text file
    let staged = composer.ingest_upload(file);

    // Then: Only the notice was emitted and the menu stays open
    assert!(staged.is_none());
    assert!(composer.stage().is_empty());
    assert!(!composer.staging_visible());
    assert!(!composer.is_computing());
    assert!(composer.menu_open());
    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert_eq!(events, vec![HostEvent::Notice(Notice::OnlyAudioAllowed)]);
}

/// WHAT: Audio uploads become the pending clip and close the menu
/// WHY: Uploaded clips follow the same staging path as recordings
#[test]
fn given_audio_file_when_uploading_then_pending_and_menu_closed() {
    // Given: A composer with the attachment menu open
    let (mut composer, _tap, rx) = composer();
    assert!(composer.toggle_menu());

    // When: Uploading a WAV file
    let id = composer.ingest_upload(wav_upload("memo.wav")).unwrap();

    // Then: Pending, real waveform, menu closed, staging revealed
    let pending = composer.stage().clip().unwrap();
    assert_eq!(pending.id(), id);
    assert_eq!(pending.name(), "memo.wav");
    assert!(!pending.waveform().is_synthetic());
    assert!(!composer.menu_open());
    assert!(composer.staging_visible());
    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            HostEvent::WaveformComputing,
            HostEvent::StagingRevealed,
            HostEvent::PendingChanged(Some(id)),
        ]
    );
}

/// WHAT: An undecodable audio upload still stages with synthetic bars
/// WHY: Decode errors are absorbed by the waveform fallback
#[test]
fn given_undecodable_audio_when_uploading_then_staged_with_synthetic_bars() {
    let (mut composer, _tap, _rx) = composer();
    let file = UploadedFile::new("song.mp3", "audio/mpeg", b"not really audio".to_vec());

    composer.ingest_upload(file).unwrap();

    let pending = composer.stage().clip().unwrap();
    assert!(pending.waveform().is_synthetic());
    assert_eq!(pending.waveform().len(), 50);
    assert_eq!(pending.duration(), None);
}

/// WHAT: A FLAC upload stages with real bars and a known duration
/// WHY: Compressed uploads must be summarized and playable, not only WAV
#[test]
fn given_flac_file_when_uploading_then_staged_with_real_waveform() {
    // Given: A FLAC upload with a loud first half and a quiet second half
    let (mut composer, _tap, _rx) = composer();
    let mut samples = vec![24_000_i16; 100];
    samples.extend(vec![0_i16; 100]);
    let file = UploadedFile::new("voice.flac", "audio/flac", flac_bytes(&samples));

    // When: Uploading it
    composer.ingest_upload(file).unwrap();

    // Then: Decoded bars, loud before quiet, duration from the stream
    let pending = composer.stage().clip().unwrap();
    assert!(!pending.waveform().is_synthetic());
    let bars = pending.waveform().bars();
    assert_eq!(bars.len(), 50);
    assert!(bars[0] > bars[49]);
    let expected = Duration::from_secs_f64(200.0 / f64::from(TEST_SAMPLE_RATE));
    assert_eq!(pending.duration(), Some(expected));
}

/// WHAT: A second upload replaces the first pending clip and releases it
/// WHY: Only one clip may be pending
#[test]
fn given_pending_upload_when_uploading_again_then_first_released() {
    // Given: One pending upload that is playing
    let (mut composer, _tap, _rx) = composer();
    composer.ingest_upload(wav_upload("first.wav")).unwrap();
    let first = composer.stage().clip().unwrap().playable();
    composer.toggle_pending_playback().unwrap();

    // When: Uploading another file
    composer.ingest_upload(wav_upload("second.wav")).unwrap();

    // Then: First reference stopped and revoked; library unaffected
    assert!(!composer.backend().is_playing(first));
    assert!(!composer.backend().is_live(first));
    assert_eq!(composer.stage().clip().unwrap().name(), "second.wav");
    assert!(composer.library().is_empty());
}

/// WHAT: Discard empties the slot; sending an empty slot does nothing
/// WHY: Commit with nothing pending is a no-op
#[test]
fn given_discarded_clip_when_sending_then_no_op() {
    // Given: A pending upload that is then discarded
    let (mut composer, _tap, rx) = composer();
    composer.ingest_upload(wav_upload("memo.wav")).unwrap();
    composer.discard_pending().unwrap();
    let _ = rx.try_iter().count();

    // When: Sending
    let sent = composer.send_pending();

    // Then: Nothing sent, no events, library empty
    assert!(sent.is_none());
    assert_eq!(rx.try_iter().count(), 0);
    assert!(composer.library().is_empty());
    assert_eq!(composer.backend().live_count(), 0);
}

/// WHAT: Removing the playing library clip reports progress 0 and the change
/// WHY: Hosts must stop drawing progress for a removed clip
#[test]
fn given_playing_library_clip_when_removed_then_progress_reset_event() {
    // Given: A committed clip that is playing
    let (mut composer, _tap, rx) = composer();
    let id = composer.ingest_upload(wav_upload("memo.wav")).unwrap();
    composer.send_pending();
    composer.toggle_playback(id).unwrap();
    let _ = rx.try_iter().count();

    // When: Removing it
    let removed = composer.remove(id).unwrap();

    // Then: Progress reset then library change, reference revoked
    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            HostEvent::PlaybackProgress {
                clip: id,
                progress: 0.0
            },
            HostEvent::LibraryChanged,
        ]
    );
    assert!(!composer.backend().is_live(removed.playable()));
    assert!(composer.library().is_empty());
}

/// WHAT: Pending and library playback are independent scopes
/// WHY: Each scope enforces its own single-playing rule
#[test]
fn given_pending_and_library_clips_when_both_played_then_both_play() {
    // Given: One committed and one pending clip
    let (mut composer, _tap, _rx) = composer();
    let committed = composer.ingest_upload(wav_upload("old.wav")).unwrap();
    composer.send_pending();
    composer.ingest_upload(wav_upload("new.wav")).unwrap();

    // When: Playing both
    composer.toggle_playback(committed).unwrap();
    composer.toggle_pending_playback().unwrap();

    // Then: Both scopes report playing
    assert_eq!(composer.library().playing(), Some(committed));
    assert!(composer.stage().is_playing());
}

/// WHAT: A refused playback start raises a notice and stays stopped
/// WHY: Errors return to the prior stable state with a transient notice
#[test]
fn given_failing_backend_when_playing_then_notice_and_stopped() {
    // Given: A composer whose backend refuses playback
    let (mut composer, _tap, rx) =
        composer_with(FakeInputDevice::new(), FakePlayback::failing());
    composer.ingest_upload(wav_upload("memo.wav")).unwrap();
    let _ = rx.try_iter().count();

    // When: Playing the pending clip
    let result = composer.toggle_pending_playback();

    // Then: Error, notice, not playing
    assert!(result.is_err());
    assert!(!composer.stage().is_playing());
    let events: Vec<HostEvent> = rx.try_iter().collect();
    assert!(events.contains(&HostEvent::Notice(Notice::PlaybackFailed)));
}

/// WHAT: Live frames report level, spectrum, and mic scale
/// WHY: The host animates the mic and bars from these events
#[test]
fn given_loud_input_when_frame_runs_then_level_and_visual_reported() {
    // Given: A listening mic over a loud window
    let (mut composer, tap, rx) = composer();
    let t0 = Instant::now();
    composer.activate_mic(t0);
    composer.on_frame(t0 + SETTLE);
    tap.set_window(vec![0.2; 256]);
    let _ = rx.try_iter().count();

    // When: A frame runs
    composer.on_frame(t0 + SETTLE + Duration::from_millis(16));

    // Then: Level ~0.2, bars for the default surface, scale 1 + 0.2 * 10
    let events: Vec<HostEvent> = rx.try_iter().collect();
    let level = events.iter().find_map(|e| match e {
        HostEvent::LevelChanged(level) => Some(*level),
        _ => None,
    });
    assert!((level.unwrap() - 0.2).abs() < 1e-5);
    assert!(events.iter().any(|e| matches!(e, HostEvent::SpectrumChanged(bars) if bars.len() == 28)));
    let visual = events.iter().find_map(|e| match e {
        HostEvent::MicVisualChanged(visual) => Some(*visual),
        _ => None,
    });
    assert!((visual.unwrap().scale - 3.0).abs() < 1e-4);
}

/// WHAT: Dropping the composer mid-recording releases the device
/// WHY: Teardown must not leave a microphone handle open
#[test]
fn given_recording_composer_when_dropped_then_device_released() {
    // Given: A composer that is recording
    let (mut composer, tap, _rx) = composer();
    assert!(composer.start_recording(Instant::now()));
    assert_eq!(tap.open_handles(), 1);

    // When: Dropping it
    drop(composer);

    // Then: No open handles remain
    assert_eq!(tap.open_handles(), 0);
}

/// WHAT: Teardown stops all playback and revokes every reference
/// WHY: Unmount releases everything the composer holds
#[test]
fn given_clips_everywhere_when_tearing_down_then_all_released() {
    // Given: A committed clip playing and a pending clip
    let (mut composer, tap, _rx) = composer();
    let id = composer.ingest_upload(wav_upload("a.wav")).unwrap();
    composer.send_pending();
    composer.toggle_playback(id).unwrap();
    composer.ingest_upload(wav_upload("b.wav")).unwrap();
    composer.start_recording(Instant::now());

    // When: Tearing down
    composer.teardown();

    // Then: Nothing live, nothing open
    assert_eq!(composer.backend().live_count(), 0);
    assert!(composer.stage().is_empty());
    assert!(composer.library().is_empty());
    assert!(!composer.is_recording());
    assert_eq!(tap.open_handles(), 0);
}

/// WHAT: Abandoning a lost waveform job returns the session to idle
/// WHY: A recording stuck finalizing would block every later start
#[test]
fn given_finalizing_recording_when_computation_abandoned_then_can_record_again() {
    // Given: A stopped recording whose waveform never arrives
    let (mut composer, tap, _rx) = composer();
    let t0 = Instant::now();
    assert!(composer.start_recording(t0));
    tap.deliver(vec![0.1; 480]);
    composer.on_frame(t0);
    assert!(composer.stop_recording().is_some());
    assert!(composer.is_computing());
    assert_eq!(composer.session().phase(), SessionPhase::Finalizing);

    // When: Abandoning the computation
    composer.abandon_computing();

    // Then: Idle again and a new recording starts
    assert!(!composer.is_computing());
    assert_eq!(composer.session().phase(), SessionPhase::Idle);
    assert!(composer.start_recording(t0 + Duration::from_secs(1)));
    assert_eq!(tap.acquisitions(), 2);
}

/// WHAT: A mic armed during finalization starts once, after the clip is staged
/// WHY: The automatic start must not retry every frame against a busy session
#[test]
fn given_mic_armed_while_finalizing_when_frames_run_then_starts_after_staging() {
    // Given: A stopped recording still finalizing and the mic armed behind it
    let (mut composer, tap, rx) = composer();
    let t0 = Instant::now();
    assert!(composer.start_recording(t0));
    tap.deliver(vec![0.1; 480]);
    composer.on_frame(t0);
    let captured = composer.stop_recording().unwrap();
    composer.activate_mic(t0);
    let _ = rx.try_iter().count();

    // When: Several frames pass the settle delay while finalizing
    for frame in 0..5 {
        composer.on_frame(t0 + SETTLE + Duration::from_millis(16 * frame));
    }

    // Then: Nothing started and the mic is still waiting
    assert!(!composer.is_recording());
    assert!(matches!(composer.mic().state(), MicState::Armed { .. }));
    assert_eq!(tap.acquisitions(), 1);
    assert!(!rx.try_iter().any(|e| e == HostEvent::RecordingChanged(true)));

    // When: The clip is staged and the next frame runs
    let extraction = composer.extractor().extract(captured.payload.bytes());
    composer.complete_recording(captured, extraction);
    composer.on_frame(t0 + SETTLE + Duration::from_millis(100));

    // Then: The armed start fires exactly once
    assert!(composer.is_recording());
    assert_eq!(composer.mic().state(), MicState::Listening);
    assert_eq!(tap.acquisitions(), 2);
}
