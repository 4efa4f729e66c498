use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::foundation::error::{LyricError, LyricResult};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arms the token for another export.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Percentages reserved for each export phase.
///
/// `[0, capture_start)` covers initialization, `[capture_start, capture_end]` frame capture,
/// `(capture_end, mux_end]` muxing. 100 is reported once the file is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgressBands {
    pub capture_start: u8,
    pub capture_end: u8,
    pub mux_end: u8,
}

impl Default for ProgressBands {
    fn default() -> Self {
        Self {
            capture_start: 5,
            capture_end: 85,
            mux_end: 99,
        }
    }
}

impl ProgressBands {
    pub fn validate(self) -> LyricResult<()> {
        if self.capture_start > self.capture_end
            || self.capture_end > self.mux_end
            || self.mux_end > 100
        {
            return Err(LyricError::validation(format!(
                "progress bands must satisfy capture_start <= capture_end <= mux_end <= 100 (got {}/{}/{})",
                self.capture_start, self.capture_end, self.mux_end
            )));
        }
        Ok(())
    }

    pub fn capture_percent(self, done: u64, total: u64) -> u8 {
        let ratio = if total == 0 {
            1.0
        } else {
            done.min(total) as f64 / total as f64
        };
        lerp_percent(self.capture_start, self.capture_end, ratio)
    }

    pub fn mux_percent(self, ratio: f64) -> u8 {
        lerp_percent(self.capture_end, self.mux_end, ratio)
    }
}

fn lerp_percent(lo: u8, hi: u8, ratio: f64) -> u8 {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let span = f64::from(hi.saturating_sub(lo));
    lo.saturating_add((span * ratio).floor() as u8)
}

/// Forwards progress to the caller's callback, never letting the percentage go backwards
/// and dropping exact repeats.
pub(crate) struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(&str, u8),
    last_percent: u8,
    last_message: String,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(callback: &'a mut dyn FnMut(&str, u8)) -> Self {
        Self {
            callback,
            last_percent: 0,
            last_message: String::new(),
        }
    }

    pub(crate) fn report(&mut self, message: &str, percent: u8) {
        let percent = percent.clamp(self.last_percent, 100);
        if percent == self.last_percent && message == self.last_message {
            return;
        }
        self.last_percent = percent;
        if message != self.last_message {
            self.last_message = message.to_string();
        }
        (self.callback)(message, percent);
    }
}
