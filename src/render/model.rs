//! Pure mapping from `(timeline, t)` to what a frame should show.
//!
//! Nothing here looks at a clock. The live preview and the exporter both call
//! [`compute_frame`]; the former with whatever the transport reports, the latter with
//! `frame / fps`. Identical inputs give identical [`FrameState`]s.

use crate::{
    render::ease::Ease,
    timing::lyric::{TimedLyric, last_started},
};

/// Visual description of one instant of the timeline.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct FrameState {
    pub time: f64,
    /// Index into the timeline of the line being sung, if any has started.
    pub active: Option<usize>,
    /// Eased position between the active line's start and the next line's start.
    pub transition_progress: f64,
    /// Fraction of the active line's own duration that has elapsed.
    pub karaoke_progress: f64,
}

pub fn compute_frame(timeline: &[TimedLyric], t: f64, ease: Ease) -> FrameState {
    let active = last_started(timeline, t);

    let transition_progress = match active {
        Some(i) if i + 1 < timeline.len() => {
            let current = &timeline[i];
            let next = &timeline[i + 1];
            let span = next.start_time - current.start_time;
            if span > 0.0 {
                ease.apply(((t - current.start_time) / span).clamp(0.0, 1.0))
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    let karaoke_progress = active.map_or(0.0, |i| karaoke_progress(&timeline[i], t));

    FrameState {
        time: t,
        active,
        transition_progress,
        karaoke_progress,
    }
}

/// `clamp((t - start) / (end - start), 0, 1)`; a line with no positive duration is either
/// untouched (`t < end`) or fully sung.
pub fn karaoke_progress(line: &TimedLyric, t: f64) -> f64 {
    let duration = line.end_time - line.start_time;
    if duration <= 0.0 {
        return if t >= line.end_time { 1.0 } else { 0.0 };
    }
    ((t - line.start_time) / duration).clamp(0.0, 1.0)
}

/// Read-only view of the timeline centred on the active line.
///
/// Offsets outside the timeline resolve to an empty line, so callers never special-case the
/// start or end of the song. Before the first line starts the window is anchored one slot
/// above it, which shows the first line as "up next".
#[derive(Clone, Copy, Debug)]
pub struct LineWindow<'a> {
    timeline: &'a [TimedLyric],
    anchor: isize,
}

impl<'a> LineWindow<'a> {
    pub fn new(timeline: &'a [TimedLyric], state: &FrameState) -> Self {
        Self {
            timeline,
            anchor: state.active.map_or(-1, |i| i as isize),
        }
    }

    pub fn index_at(&self, offset: isize) -> Option<usize> {
        let idx = self.anchor + offset;
        (idx >= 0 && (idx as usize) < self.timeline.len()).then_some(idx as usize)
    }

    pub fn line_at(&self, offset: isize) -> Option<&'a TimedLyric> {
        self.index_at(offset).map(|i| &self.timeline[i])
    }

    pub fn text_at(&self, offset: isize) -> &'a str {
        self.line_at(offset).map_or("", |l| l.text.as_str())
    }
}

/// Which neighbours of the active line are laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Two lines before, the active line and three after.
    #[default]
    Full,
    /// The active line plus a preview of the next one.
    ActiveAndNext,
}

impl WindowMode {
    fn offsets(self) -> std::ops::RangeInclusive<isize> {
        match self {
            Self::Full => -2..=3,
            Self::ActiveAndNext => 0..=1,
        }
    }
}

/// Lines further than this from the centre (in line slots) are not drawn.
const VISIBLE_SLOTS: f64 = 2.5;
/// Distance (in slots) under which an inactive line uses the brighter inactive colour.
const NEAR_SLOTS: f64 = 1.5;

/// One line of the window with its blended layout.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine<'a> {
    pub offset: isize,
    pub timeline_index: usize,
    pub text: &'a str,
    /// Continuous slot position: `offset - transition_progress`.
    pub position: f64,
    /// Vertical offset from the centre line, in pixels.
    pub y_offset: f64,
    pub scale: f64,
    pub opacity: f64,
    pub is_active: bool,
    pub is_near: bool,
}

impl FrameState {
    /// Lays out the visible window: each line slides from its slot toward the next one as the
    /// transition progresses, shrinking and fading with distance from the centre.
    pub fn placements<'a>(
        &self,
        timeline: &'a [TimedLyric],
        mode: WindowMode,
        line_height: f64,
    ) -> Vec<PlacedLine<'a>> {
        let window = LineWindow::new(timeline, self);
        let mut out = Vec::new();
        for offset in mode.offsets() {
            let Some(timeline_index) = window.index_at(offset) else {
                continue;
            };
            let position = offset as f64 - self.transition_progress;
            if position.abs() > VISIBLE_SLOTS {
                continue;
            }
            let dist = position.abs();
            out.push(PlacedLine {
                offset,
                timeline_index,
                text: timeline[timeline_index].text.as_str(),
                position,
                y_offset: position * line_height,
                scale: (1.0 - 0.1 * dist).max(0.0),
                opacity: (1.0 - 0.3 * dist).max(0.0),
                is_active: offset == 0 && self.active.is_some(),
                is_near: dist < NEAR_SLOTS,
            });
        }
        out
    }
}

/// Granularity of the karaoke highlight on the active line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightMode {
    /// One sweep across the whole line.
    #[default]
    Line,
    Word,
    Character,
}

/// A run of text with its own highlight fraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TokenFill<'a> {
    pub text: &'a str,
    pub is_space: bool,
    pub fill: f64,
}

pub fn highlight_fills(text: &str, progress: f64, mode: HighlightMode) -> Vec<TokenFill<'_>> {
    match mode {
        HighlightMode::Line => vec![TokenFill {
            text,
            is_space: false,
            fill: progress.clamp(0.0, 1.0),
        }],
        HighlightMode::Word => word_fills(text, progress),
        HighlightMode::Character => char_fills(text, progress),
    }
}

/// Spreads `progress` evenly over the whitespace-separated words of `text`.
///
/// Word `k` of `n` (1-based) is full once `progress >= k/n` and ramps linearly over
/// `[(k-1)/n, k/n)`. Separators are kept and take the fill of the word before them.
pub fn word_fills(text: &str, progress: f64) -> Vec<TokenFill<'_>> {
    distribute(split_runs(text), progress)
}

/// Same as [`word_fills`] with every non-space character as its own token.
pub fn char_fills(text: &str, progress: f64) -> Vec<TokenFill<'_>> {
    let mut tokens = Vec::new();
    for (run, is_space) in split_runs(text) {
        if is_space {
            tokens.push((run, true));
        } else {
            let mut it = run.char_indices().peekable();
            while let Some((start, _)) = it.next() {
                let end = it.peek().map_or(run.len(), |(i, _)| *i);
                tokens.push((&run[start..end], false));
            }
        }
    }
    distribute(tokens, progress)
}

fn split_runs(text: &str) -> Vec<(&str, bool)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let ws = c.is_whitespace();
        match current {
            Some(prev) if prev == ws => {}
            Some(prev) => {
                runs.push((&text[start..i], prev));
                start = i;
                current = Some(ws);
            }
            None => current = Some(ws),
        }
    }
    if let Some(ws) = current {
        runs.push((&text[start..], ws));
    }
    runs
}

fn distribute(tokens: Vec<(&str, bool)>, progress: f64) -> Vec<TokenFill<'_>> {
    let n = tokens.iter().filter(|(_, ws)| !ws).count();
    let scaled = progress.clamp(0.0, 1.0) * n as f64;
    let mut k = 0usize;
    let mut last_fill = 0.0;
    tokens
        .into_iter()
        .map(|(text, is_space)| {
            if !is_space {
                last_fill = (scaled - k as f64).clamp(0.0, 1.0);
                k += 1;
            }
            TokenFill {
                text,
                is_space,
                fill: last_fill,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_world() -> Vec<TimedLyric> {
        vec![
            TimedLyric::new("Hello", 0.0, 2.0),
            TimedLyric::new("World", 2.0, 5.0),
        ]
    }

    #[test]
    fn before_first_line_nothing_is_active() {
        let f = compute_frame(&hello_world(), -1.0, Ease::InOutCubic);
        assert_eq!(f.active, None);
        assert_eq!(f.transition_progress, 0.0);
        assert_eq!(f.karaoke_progress, 0.0);
    }

    #[test]
    fn transition_is_eased_between_line_starts() {
        let timeline = hello_world();
        let f = compute_frame(&timeline, 0.5, Ease::InOutCubic);
        assert_eq!(f.transition_progress, Ease::InOutCubic.apply(0.25));
        let linear = compute_frame(&timeline, 0.5, Ease::Linear);
        assert_eq!(linear.transition_progress, 0.25);
        let last = compute_frame(&timeline, 4.0, Ease::InOutCubic);
        assert_eq!(last.transition_progress, 0.0);
    }

    #[test]
    fn degenerate_durations_are_all_or_nothing() {
        let zero = TimedLyric::new("x", 3.0, 3.0);
        assert_eq!(karaoke_progress(&zero, 2.9), 0.0);
        assert_eq!(karaoke_progress(&zero, 3.0), 1.0);
        let negative = TimedLyric::new("x", 3.0, 2.0);
        assert_eq!(karaoke_progress(&negative, 2.5), 1.0);
        assert_eq!(karaoke_progress(&negative, 1.0), 0.0);
    }

    #[test]
    fn window_returns_empty_outside_timeline() {
        let timeline = hello_world();
        let before = compute_frame(&timeline, -1.0, Ease::Linear);
        let w = LineWindow::new(&timeline, &before);
        assert_eq!(w.text_at(0), "");
        assert_eq!(w.text_at(1), "Hello");
        assert_eq!(w.text_at(2), "World");
        assert_eq!(w.text_at(-2), "");
        assert!(w.line_at(3).is_none());
    }

    #[test]
    fn placements_shrink_and_fade_by_distance() {
        let timeline: Vec<TimedLyric> = (0..8)
            .map(|i| TimedLyric::new(format!("l{i}"), i as f64, i as f64 + 1.0))
            .collect();
        let f = compute_frame(&timeline, 4.0, Ease::InOutCubic);
        let placed = f.placements(&timeline, WindowMode::Full, 100.0);
        let offsets: Vec<isize> = placed.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![-2, -1, 0, 1, 2]);

        let active = placed.iter().find(|p| p.is_active).unwrap();
        assert_eq!(active.text, "l4");
        assert_eq!((active.scale, active.opacity, active.y_offset), (1.0, 1.0, 0.0));

        let two_below = placed.iter().find(|p| p.offset == 2).unwrap();
        assert!((two_below.scale - 0.8).abs() < 1e-12);
        assert!((two_below.opacity - 0.4).abs() < 1e-12);
        assert_eq!(two_below.y_offset, 200.0);
        assert!(!two_below.is_near);

        let mid = compute_frame(&timeline, 4.5, Ease::Linear);
        let placed = mid.placements(&timeline, WindowMode::Full, 100.0);
        let offsets: Vec<isize> = placed.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![-2, -1, 0, 1, 2, 3]);
        assert!(placed.iter().all(|p| p.position.abs() <= 2.5));
    }

    #[test]
    fn active_and_next_mode_limits_window() {
        let timeline = hello_world();
        let f = compute_frame(&timeline, 1.0, Ease::Linear);
        let placed = f.placements(&timeline, WindowMode::ActiveAndNext, 10.0);
        let texts: Vec<&str> = placed.iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["Hello", "World"]);
    }

    #[test]
    fn word_fills_ramp_one_word_at_a_time() {
        let fills = word_fills("one two  three", 0.5);
        let texts: Vec<&str> = fills.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["one", " ", "two", "  ", "three"]);
        assert_eq!(fills[0].fill, 1.0);
        assert_eq!(fills[1].fill, 1.0);
        assert!((fills[2].fill - 0.5).abs() < 1e-12);
        assert!((fills[3].fill - 0.5).abs() < 1e-12);
        assert_eq!(fills[4].fill, 0.0);

        let done = word_fills("one two", 1.0);
        assert!(done.iter().all(|t| t.fill == 1.0));
    }

    #[test]
    fn char_fills_split_non_space_chars() {
        let fills = char_fills("ab c", 0.5);
        let texts: Vec<&str> = fills.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["a", "b", " ", "c"]);
        assert_eq!(fills[0].fill, 1.0);
        assert!((fills[1].fill - 0.5).abs() < 1e-12);
        assert_eq!(fills[3].fill, 0.0);

        let cjk = char_fills("你好", 0.5);
        assert_eq!(cjk.len(), 2);
        assert_eq!(cjk[0].fill, 1.0);
        assert_eq!(cjk[1].fill, 0.0);
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert!(word_fills("", 0.7).is_empty());
        assert_eq!(highlight_fills("", 0.7, HighlightMode::Line).len(), 1);
    }
}
