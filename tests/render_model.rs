use lyricframe::{
    Ease, FrameState, TimedLyric, WindowMode, compute_frame,
    render::model::{HighlightMode, LineWindow, highlight_fills},
};

fn timeline() -> Vec<TimedLyric> {
    vec![
        TimedLyric::new("Hello", 0.0, 2.0),
        TimedLyric::new("World", 2.0, 5.0),
    ]
}

#[test]
fn hello_world_scenario() {
    let tl = timeline();
    let a = compute_frame(&tl, 1.0, Ease::default());
    assert_eq!(a.active, Some(0));
    assert_eq!(a.karaoke_progress, 0.5);

    let b = compute_frame(&tl, 3.5, Ease::default());
    assert_eq!(b.active, Some(1));
    assert_eq!(b.karaoke_progress, 0.5);
}

#[test]
fn frames_are_pure_functions_of_time() {
    let tl = timeline();
    for i in 0..=60 {
        let t = f64::from(i) * 0.1;
        for ease in [Ease::Linear, Ease::InOutQuad, Ease::OutCubic, Ease::InOutCubic] {
            assert_eq!(compute_frame(&tl, t, ease), compute_frame(&tl, t, ease));
        }
    }
}

#[test]
fn karaoke_never_goes_backwards_within_a_line() {
    let tl = timeline();
    let mut prev = 0.0;
    for i in 0..=200 {
        let t = 2.0 + 3.0 * f64::from(i) / 200.0;
        let state = compute_frame(&tl, t.min(4.999), Ease::default());
        assert_eq!(state.active, Some(1));
        assert!(state.karaoke_progress >= prev);
        prev = state.karaoke_progress;
    }
}

#[test]
fn before_the_first_line_nothing_is_active() {
    let tl = vec![TimedLyric::new("late", 3.0, 4.0)];
    let state = compute_frame(&tl, 1.0, Ease::default());
    assert_eq!(
        state,
        FrameState {
            time: 1.0,
            active: None,
            transition_progress: 0.0,
            karaoke_progress: 0.0,
        }
    );
    let window = LineWindow::new(&tl, &state);
    assert_eq!(window.text_at(0), "");
    assert_eq!(window.text_at(1), "late");
}

#[test]
fn window_is_centred_on_the_active_line() {
    let tl: Vec<TimedLyric> = (0..8)
        .map(|i| TimedLyric::new(format!("line {i}"), f64::from(i), f64::from(i + 1)))
        .collect();
    let state = compute_frame(&tl, 4.0, Ease::Linear);
    let placed = state.placements(&tl, WindowMode::Full, 60.0);
    let indices: Vec<usize> = placed.iter().map(|p| p.timeline_index).collect();
    assert_eq!(indices, vec![2, 3, 4, 5, 6]);

    let active = placed.iter().find(|p| p.is_active).unwrap();
    assert_eq!(active.timeline_index, 4);
    assert_eq!(active.y_offset, 0.0);
    assert_eq!(active.scale, 1.0);

    let short = state.placements(&tl, WindowMode::ActiveAndNext, 60.0);
    assert_eq!(short.len(), 2);
}

#[test]
fn word_highlight_fills_left_to_right() {
    let fills = highlight_fills("one two", 0.75, HighlightMode::Word);
    let words: Vec<(&str, f64)> = fills
        .iter()
        .filter(|f| !f.is_space)
        .map(|f| (f.text, f.fill))
        .collect();
    assert_eq!(words, vec![("one", 1.0), ("two", 0.5)]);
}
