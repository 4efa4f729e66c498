use crate::{
    foundation::error::{LyricError, LyricResult},
    timing::lyric::TimedLyric,
};

/// Text of the trailing marker line whose timestamp closes the last real lyric.
pub const END_SENTINEL: &str = "END";

/// An assignment that breaks ascending order with an already-timed neighbour.
///
/// Reported, never rejected: the render model defines behaviour for zero and negative
/// durations, so the user can keep tapping and fix the order later.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrderingConflict {
    pub index: usize,
    pub neighbour: usize,
    pub neighbour_time: f64,
}

/// Interactive timing state for one lyric sheet.
///
/// `lines` always ends with [`END_SENTINEL`]. Indices passed to the mutating methods must be
/// in range; an out-of-range index is a bug in the caller and panics.
#[derive(Clone, Debug)]
pub struct TimingSession {
    lines: Vec<String>,
    timestamps: Vec<Option<f64>>,
    cursor: usize,
}

impl TimingSession {
    /// Splits `lyric_text` on line breaks, drops blank lines and appends the sentinel.
    pub fn new(lyric_text: &str) -> Self {
        let mut lines: Vec<String> = lyric_text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        lines.push(END_SENTINEL.to_string());
        let timestamps = vec![None; lines.len()];
        Self {
            lines,
            timestamps,
            cursor: 0,
        }
    }

    /// Re-opens a finished timeline for editing. The sentinel gets the last end time.
    pub fn from_lyrics(lyrics: &[TimedLyric]) -> Self {
        let mut lines: Vec<String> = lyrics.iter().map(|l| l.text.clone()).collect();
        let mut timestamps: Vec<Option<f64>> = lyrics.iter().map(|l| Some(l.start_time)).collect();
        lines.push(END_SENTINEL.to_string());
        timestamps.push(lyrics.last().map(|l| l.end_time));
        Self {
            lines,
            timestamps,
            cursor: 0,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn timestamps(&self) -> &[Option<f64>] {
        &self.timestamps
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_sentinel(&self, index: usize) -> bool {
        index == self.lines.len() - 1
    }

    /// Records `time` as the start of line `index` and advances the cursor past it.
    pub fn assign_timestamp(&mut self, index: usize, time: f64) -> Option<OrderingConflict> {
        self.timestamps[index] = Some(time);
        if index < self.lines.len() - 1 {
            self.cursor = index + 1;
        }

        let conflict = self.ordering_conflict(index);
        if let Some(c) = conflict {
            tracing::warn!(
                line = c.index,
                time,
                neighbour = c.neighbour,
                neighbour_time = c.neighbour_time,
                "timestamp is out of order with a neighbouring line"
            );
        }
        conflict
    }

    pub fn assign_at_cursor(&mut self, time: f64) -> Option<OrderingConflict> {
        self.assign_timestamp(self.cursor, time)
    }

    pub fn clear_timestamp(&mut self, index: usize) {
        self.timestamps[index] = None;
    }

    pub fn edit_line_text(&mut self, index: usize, text: impl Into<String>) {
        self.lines[index] = text.into();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let max = self.lines.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.lines.len() - 1);
    }

    /// The line being heard at `t`: last line whose timestamp is `<= t`.
    pub fn playing_line(&self, t: f64) -> Option<usize> {
        self.timestamps
            .iter()
            .rposition(|ts| ts.is_some_and(|v| v <= t))
    }

    /// End time shown beside a timed line while editing: the next assigned start, or the
    /// audio duration when nothing later is timed yet.
    pub fn provisional_end(&self, index: usize, duration: f64) -> Option<f64> {
        self.timestamps[index]?;
        Some(self.next_assigned_after(index).unwrap_or(duration))
    }

    pub fn missing(&self) -> Vec<usize> {
        self.timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| ts.is_none().then_some(i))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.timestamps.iter().all(Option::is_some)
    }

    /// Every out-of-order pair currently in the session, as `(earlier line, later line)`.
    pub fn ordering_conflicts(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut prev: Option<(usize, f64)> = None;
        for (i, ts) in self.timestamps.iter().enumerate() {
            let Some(t) = *ts else { continue };
            if let Some((pi, pt)) = prev
                && t < pt
            {
                out.push((pi, i));
            }
            prev = Some((i, t));
        }
        out
    }

    /// Produces the finished timeline, excluding the sentinel.
    ///
    /// Refused (and the session left untouched) while any line, the sentinel included, has no
    /// timestamp. Each line ends where the next line starts, so the last real line ends at the
    /// sentinel.
    pub fn finalize(&self) -> LyricResult<Vec<TimedLyric>> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(LyricError::IncompleteTiming { missing });
        }

        let starts: Vec<f64> = self.timestamps.iter().flatten().copied().collect();
        Ok(self
            .lines
            .iter()
            .zip(starts.windows(2))
            .map(|(text, pair)| TimedLyric::new(text.clone(), pair[0], pair[1]))
            .collect())
    }

    fn next_assigned_after(&self, index: usize) -> Option<f64> {
        self.timestamps[index + 1..].iter().find_map(|ts| *ts)
    }

    fn ordering_conflict(&self, index: usize) -> Option<OrderingConflict> {
        let t = self.timestamps[index]?;
        let before = self.timestamps[..index]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, ts)| ts.map(|v| (i, v)));
        if let Some((i, v)) = before
            && t < v
        {
            return Some(OrderingConflict {
                index,
                neighbour: i,
                neighbour_time: v,
            });
        }
        let after = self.timestamps[index + 1..]
            .iter()
            .enumerate()
            .find_map(|(i, ts)| ts.map(|v| (index + 1 + i, v)));
        if let Some((i, v)) = after
            && t > v
        {
            return Some(OrderingConflict {
                index,
                neighbour: i,
                neighbour_time: v,
            });
        }
        None
    }
}
