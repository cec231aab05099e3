use crate::{
    ClipLibrary, PendingClipStage,
    tests::fakes::{BackendCall, FakePlayback, make_clip},
};

/// WHAT: Staging B while A plays stops and releases A before B is pending
/// WHY: Two pending transports may never coexist
#[test]
fn given_pending_clip_playing_when_staging_another_then_first_released() {
    // Given: Clip A staged and playing, plus an unrelated library
    let mut backend = FakePlayback::new();
    let library = ClipLibrary::new();
    let a = make_clip(&mut backend, "a");
    let b = make_clip(&mut backend, "b");
    let (a_id, a_ref, b_id) = (a.id(), a.playable(), b.id());
    let mut stage = PendingClipStage::new();
    stage.stage(&mut backend, a);
    stage.toggle_playback(&mut backend).unwrap();
    assert!(stage.is_playing());

    // When: Staging B
    let replaced = stage.stage(&mut backend, b);

    // Then: A paused then revoked; B pending and idle; library untouched
    assert_eq!(replaced, Some(a_id));
    let pause = backend.position_of_call(BackendCall::Pause(a_ref)).unwrap();
    let revoke = backend.position_of_call(BackendCall::Revoke(a_ref)).unwrap();
    assert!(pause < revoke);
    assert!(!backend.is_live(a_ref));
    assert_eq!(stage.clip().map(|c| c.id()), Some(b_id));
    assert!(!stage.is_playing());
    assert_eq!(stage.progress(), 0.0);
    assert!(library.is_empty());
}

/// WHAT: Commit moves the clip into the library and empties the slot
/// WHY: A committed clip exists in exactly one container
#[test]
fn given_pending_clip_when_committing_twice_then_moved_once() {
    // Given: A staged clip
    let mut backend = FakePlayback::new();
    let mut library = ClipLibrary::new();
    let clip = make_clip(&mut backend, "memo");
    let (id, playable) = (clip.id(), clip.playable());
    let mut stage = PendingClipStage::new();
    stage.stage(&mut backend, clip);

    // When: Committing, then committing again
    let first = stage.commit(&mut backend, &mut library);
    let second = stage.commit(&mut backend, &mut library);

    // Then: Library holds the clip once, slot empty, reference still live
    assert_eq!(first, Some(id));
    assert_eq!(second, None);
    assert!(stage.is_empty());
    assert_eq!(library.len(), 1);
    assert_eq!(library.clips()[0].name(), "memo");
    assert!(backend.is_live(playable));
}

/// WHAT: Committing while the pending clip plays stops that playback
/// WHY: Ownership transfers without carrying the pending transport along
#[test]
fn given_playing_pending_clip_when_committing_then_playback_stopped() {
    // Given: A pending clip that is playing
    let mut backend = FakePlayback::new();
    let mut library = ClipLibrary::new();
    let clip = make_clip(&mut backend, "memo");
    let playable = clip.playable();
    let mut stage = PendingClipStage::new();
    stage.stage(&mut backend, clip);
    stage.toggle_playback(&mut backend).unwrap();

    // When: Committing
    stage.commit(&mut backend, &mut library);

    // Then: Not playing anywhere
    assert!(!backend.is_playing(playable));
    assert_eq!(library.playing(), None);
}

/// WHAT: Discard stops, revokes, and empties; an empty discard is a no-op
/// WHY: Discarded clips must not leak playable references
#[test]
fn given_pending_clip_when_discarding_then_reference_revoked() {
    // Given: A staged clip
    let mut backend = FakePlayback::new();
    let clip = make_clip(&mut backend, "memo");
    let playable = clip.playable();
    let mut stage = PendingClipStage::new();
    stage.stage(&mut backend, clip);

    // When: Discarding twice
    let first = stage.discard(&mut backend);
    let second = stage.discard(&mut backend);

    // Then: One discard happened and the reference is gone
    assert!(first.is_some());
    assert!(second.is_none());
    assert!(stage.is_empty());
    assert_eq!(backend.live_count(), 0);
    assert!(!backend.is_live(playable));
}

/// WHAT: Transport passthrough on an empty slot does nothing
/// WHY: Controls may be pressed before anything is staged
#[test]
fn given_empty_stage_when_toggling_or_seeking_then_no_backend_calls() {
    // Given: An empty stage
    let mut backend = FakePlayback::new();
    let mut stage = PendingClipStage::new();

    // When: Toggling and seeking
    stage.toggle_playback(&mut backend).unwrap();
    stage.seek(&mut backend, 0.5);

    // Then: Nothing reached the backend
    assert!(backend.calls.is_empty());
    assert_eq!(stage.progress(), 0.0);
}
