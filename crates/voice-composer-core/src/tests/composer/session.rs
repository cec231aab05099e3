use crate::{
    AudioError, ElapsedCounter, RecordingSession, SessionPhase, SpectrumLayout, StartOutcome,
    WaveformExtractor,
    tests::fakes::{FakeInputDevice, FakePlayback, TEST_SAMPLE_RATE},
};

use std::time::{Duration, Instant};

fn session() -> (RecordingSession<FakeInputDevice>, crate::tests::fakes::DeviceTap) {
    let device = FakeInputDevice::new();
    let tap = device.tap();
    (RecordingSession::new(device, SpectrumLayout::default()), tap)
}

/// WHAT: Starting twice opens exactly one device handle
/// WHY: Only one microphone session may be open at a time
#[test]
fn given_capturing_session_when_starting_again_then_single_handle() {
    // Given: A session that started
    let (mut session, tap) = session();
    let now = Instant::now();
    assert_eq!(session.start(now).unwrap(), StartOutcome::Started);

    // When: Starting again without stopping
    let second = session.start(now).unwrap();

    // Then: No-op, one acquisition, one open handle
    assert_eq!(second, StartOutcome::AlreadyActive);
    assert_eq!(tap.acquisitions(), 1);
    assert_eq!(tap.open_handles(), 1);
    assert_eq!(session.phase(), SessionPhase::Capturing);
}

/// WHAT: A denied device leaves the session idle
/// WHY: Permission failures are recoverable and must not wedge the state
#[test]
fn given_denied_device_when_starting_then_error_and_idle() {
    // Given: A device that refuses access
    let mut session = RecordingSession::new(FakeInputDevice::denied(), SpectrumLayout::default());

    // When: Starting
    let result = session.start(Instant::now());

    // Then: DeviceUnavailable, still idle, no analysis scheduled
    assert!(matches!(result, Err(AudioError::DeviceUnavailable { .. })));
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(!session.is_analysing());
}

/// WHAT: Stop flushes chunks, releases the handle, and cancels analysis
/// WHY: Leaking an open microphone handle is a defect
#[test]
fn given_capturing_session_when_stopping_then_released_and_flushed() {
    // Given: A capture that received chunks, some after the last frame
    let (mut session, tap) = session();
    let start = Instant::now();
    session.start(start).unwrap();
    tap.deliver(vec![0.25; 1000]);
    session.on_frame(start + Duration::from_millis(16));
    tap.deliver(vec![0.25; 500]);

    // When: Stopping
    let captured = session.stop().unwrap().unwrap();

    // Then: Handle released, every chunk included, analysis cancelled
    assert_eq!(tap.open_handles(), 0);
    assert_eq!(tap.releases(), 1);
    assert_eq!(tap.undelivered(), 0);
    assert!(!session.is_analysing());
    assert_eq!(session.phase(), SessionPhase::Finalizing);
    let expected = Duration::from_secs_f64(1500.0 / f64::from(TEST_SAMPLE_RATE));
    assert_eq!(captured.duration, expected);
    assert!(captured.clip_name().starts_with("Recording "));
}

/// WHAT: Stopping an idle session returns nothing
/// WHY: Stop is only meaningful while capturing
#[test]
fn given_idle_session_when_stopping_then_none() {
    let (mut session, tap) = session();

    assert!(session.stop().unwrap().is_none());
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert_eq!(tap.releases(), 0);
}

/// WHAT: Finalize builds a recorded clip and returns to idle
/// WHY: The session lifecycle ends at idle, ready for the next capture
#[test]
fn given_finalizing_session_when_finalizing_then_clip_and_idle() {
    // Given: A stopped capture
    let (mut session, _tap) = session();
    let mut backend = FakePlayback::new();
    session.start(Instant::now()).unwrap();
    let captured = session.stop().unwrap().unwrap();
    let extraction = WaveformExtractor::default().extract(captured.payload.bytes());
    let name = captured.clip_name();

    // When: Finalizing
    let clip = session.finalize(&mut backend, captured, extraction);

    // Then: Clip carries the timestamped name and a live reference
    assert_eq!(clip.name(), name);
    assert!(backend.is_live(clip.playable()));
    assert_eq!(session.phase(), SessionPhase::Idle);
}

/// WHAT: A new session can acquire only after the previous one released
/// WHY: Release must happen before the device is reused
#[test]
fn given_stopped_session_when_restarting_then_previous_handle_already_released() {
    // Given: A session that was started and stopped
    let (mut session, tap) = session();
    session.start(Instant::now()).unwrap();
    session.stop().unwrap();
    session.abandon_finalizing();

    // When: Starting again
    session.start(Instant::now()).unwrap();

    // Then: Two acquisitions, one release, one open handle
    assert_eq!(tap.acquisitions(), 2);
    assert_eq!(tap.releases(), 1);
    assert_eq!(tap.open_handles(), 1);
}

/// WHAT: Teardown and drop run the same release sequence as stop
/// WHY: No handle, timer, or tick may survive unmount
#[test]
fn given_capturing_session_when_dropped_then_handle_released() {
    // Given: A capturing session
    let (mut session, tap) = session();
    session.start(Instant::now()).unwrap();
    assert!(session.is_analysing());

    // When: Dropping it without stopping
    drop(session);

    // Then: The handle was released
    assert_eq!(tap.open_handles(), 0);
    assert_eq!(tap.releases(), 1);
}

/// WHAT: Elapsed time advances once per whole second
/// WHY: The recording clock shows whole seconds
#[test]
fn given_capture_when_frames_pass_then_elapsed_counts_seconds() {
    // Given: A capture started at t0
    let (mut session, _tap) = session();
    let t0 = Instant::now();
    session.start(t0).unwrap();

    // When: Frames arrive at 0.5s, 1.2s, and 3.1s
    let half = session.on_frame(t0 + Duration::from_millis(500));
    let one = session.on_frame(t0 + Duration::from_millis(1200));
    let three = session.on_frame(t0 + Duration::from_millis(3100));

    // Then: The counter reports 1 then 3, and every frame emitted a snapshot
    assert_eq!(half.elapsed, None);
    assert_eq!(one.elapsed, Some(1));
    assert_eq!(three.elapsed, Some(3));
    assert!(half.snapshot.is_some() && three.snapshot.is_some());
    assert_eq!(session.elapsed_seconds(), Some(3));
}

/// WHAT: The counter catches up on missed seconds
/// WHY: A stalled frame loop must not lose time
#[test]
fn given_counter_when_polled_late_then_catches_up() {
    let t0 = Instant::now();
    let mut counter = ElapsedCounter::start(t0);

    assert_eq!(counter.poll(t0 + Duration::from_millis(999)), None);
    assert_eq!(counter.poll(t0 + Duration::from_secs(5)), Some(5));
    assert_eq!(counter.poll(t0 + Duration::from_secs(5)), None);
    assert_eq!(counter.seconds(), 5);
}
