use std::time::Instant;

/// The audio playback device the clock drives. Implementations are supplied by the host.
///
/// `duration` mirrors what media elements report: NaN while metadata is unknown, possibly
/// infinite for streams. Callers validate before relying on it.
pub trait AudioTransport {
    fn duration(&self) -> f64;
    fn position(&self) -> f64;
    fn set_position(&mut self, t: f64);
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;
}

/// Silent transport whose position follows the monotonic clock while playing.
///
/// Stands in for a real audio device in the CLI and in tests. `advance` moves the position
/// without waiting, which keeps tests independent of wall-clock speed.
#[derive(Clone, Debug)]
pub struct SimulatedTransport {
    duration: f64,
    base: f64,
    started: Option<Instant>,
}

impl SimulatedTransport {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            base: 0.0,
            started: None,
        }
    }

    pub fn advance(&mut self, secs: f64) {
        self.base = self.clamp(self.base + secs);
    }

    fn clamp(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        if self.duration.is_finite() {
            t.min(self.duration.max(0.0))
        } else {
            t
        }
    }
}

impl AudioTransport for SimulatedTransport {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn position(&self) -> f64 {
        match self.started {
            Some(at) => self.clamp(self.base + at.elapsed().as_secs_f64()),
            None => self.base,
        }
    }

    fn set_position(&mut self, t: f64) {
        self.base = self.clamp(t);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn play(&mut self) {
        if self.started.is_some() {
            return;
        }
        if self.has_ended() {
            self.base = 0.0;
        }
        self.started = Some(Instant::now());
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.started = None;
    }

    fn is_paused(&self) -> bool {
        self.started.is_none() || self.has_ended()
    }

    fn has_ended(&self) -> bool {
        self.duration.is_finite() && self.position() >= self.duration
    }
}
