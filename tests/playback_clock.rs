use lyricframe::{
    ClockOwner, Ease, LivePreview, PlaybackClock, SimulatedTransport, TimedLyric, compute_frame,
};

#[test]
fn seek_then_preview_matches_the_render_model() {
    let tl = vec![
        TimedLyric::new("Hello", 0.0, 2.0),
        TimedLyric::new("World", 2.0, 5.0),
    ];
    let mut clock = PlaybackClock::new(SimulatedTransport::new(5.0));
    let mut preview = LivePreview::new(tl.clone(), Ease::default());

    let t = clock.seek(3.5);
    let tick = preview.refresh(t);
    assert_eq!(tick.state, compute_frame(&tl, 3.5, Ease::default()));
    assert!(tick.line_changed);
    assert!(!preview.refresh(t).line_changed);
}

#[test]
fn playback_runs_to_the_end_and_stops() {
    let mut clock = PlaybackClock::new(SimulatedTransport::new(5.0));
    assert!(clock.play());
    clock.transport_mut().advance(6.0);
    assert_eq!(clock.tick(), Some(5.0));
    assert!(clock.has_ended());
    assert!(!clock.is_playing());
    assert_eq!(clock.tick(), None);

    clock.seek(1.0);
    assert!(!clock.has_ended());
}

#[test]
fn export_ownership_round_trip() {
    let mut clock = PlaybackClock::new(SimulatedTransport::new(5.0));
    clock.play();
    clock.begin_export().unwrap();
    assert_eq!(clock.owner(), ClockOwner::Export);
    assert!(!clock.is_playing());
    assert!(clock.begin_export().is_err());

    clock.seek(4.0);
    clock.end_export();
    assert_eq!(clock.owner(), ClockOwner::Live);
    assert_eq!(clock.current_time(), 0.0);
    assert!(!clock.is_playing());
}
