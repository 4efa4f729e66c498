use std::time::Duration;

use crate::{
    playback::{clock::PlaybackClock, transport::AudioTransport},
    render::{
        ease::Ease,
        model::{FrameState, compute_frame},
    },
    timing::lyric::TimedLyric,
};

/// Output of one live refresh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewTick {
    pub state: FrameState,
    /// The active line differs from the previous refresh (or this is the first one).
    pub line_changed: bool,
}

/// The interactive loop: polled once per display refresh while the clock is playing.
///
/// Holds no animation state of its own. Every frame comes from [`compute_frame`] at the
/// clock's current time, so scrubbing and playback show exactly what an export would.
#[derive(Clone, Debug)]
pub struct LivePreview {
    timeline: Vec<TimedLyric>,
    ease: Ease,
    last_active: Option<Option<usize>>,
}

impl LivePreview {
    pub fn new(timeline: Vec<TimedLyric>, ease: Ease) -> Self {
        Self {
            timeline,
            ease,
            last_active: None,
        }
    }

    pub fn timeline(&self) -> &[TimedLyric] {
        &self.timeline
    }

    pub fn set_timeline(&mut self, timeline: Vec<TimedLyric>) {
        self.timeline = timeline;
        self.last_active = None;
    }

    /// Advances with the clock. `None` once the clock is paused or has finished.
    pub fn tick<T: AudioTransport>(&mut self, clock: &mut PlaybackClock<T>) -> Option<PreviewTick> {
        let t = clock.tick()?;
        Some(self.refresh(t))
    }

    /// Recomputes the frame for `t` without touching the clock (seeking while paused).
    pub fn refresh(&mut self, t: f64) -> PreviewTick {
        let state = compute_frame(&self.timeline, t, self.ease);
        let line_changed = self.last_active != Some(state.active);
        self.last_active = Some(state.active);
        PreviewTick {
            state,
            line_changed,
        }
    }

    /// Drives the loop until playback stops, sleeping `interval` between refreshes.
    ///
    /// Returns the number of refreshes delivered.
    pub fn run<T: AudioTransport>(
        &mut self,
        clock: &mut PlaybackClock<T>,
        interval: Duration,
        mut on_frame: impl FnMut(&PreviewTick),
    ) -> u64 {
        let mut frames = 0u64;
        while let Some(tick) = self.tick(clock) {
            on_frame(&tick);
            frames += 1;
            if !clock.is_playing() {
                break;
            }
            std::thread::sleep(interval);
        }
        tracing::debug!(frames, ended = clock.has_ended(), "live preview stopped");
        frames
    }
}
