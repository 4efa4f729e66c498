/// One lyric line with absolute start/end times in seconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimedLyric {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl TimedLyric {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time
    }
}

/// Index of the last line whose start time is `<= t`.
///
/// Lines are scanned back to front so an out-of-order timeline still resolves to
/// exactly one line.
pub fn last_started(timeline: &[TimedLyric], t: f64) -> Option<usize> {
    timeline.iter().rposition(|l| l.start_time <= t)
}
