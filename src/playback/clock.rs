use crate::{
    foundation::error::{LyricError, LyricResult},
    playback::transport::AudioTransport,
};

/// Which loop currently drives the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockOwner {
    /// Interactive playback; the live preview polls the clock.
    Live,
    /// An export is stepping the transport frame by frame. Playback controls are refused.
    Export,
}

/// Playback state layered over an [`AudioTransport`].
///
/// `current_time` is refreshed by [`tick`](Self::tick) on every display refresh while
/// playing, and once on pause and seek. `ended` latches when the transport reaches the end
/// and is cleared by any seek or restart.
#[derive(Debug)]
pub struct PlaybackClock<T: AudioTransport> {
    transport: T,
    current_time: f64,
    playing: bool,
    ended: bool,
    owner: ClockOwner,
}

impl<T: AudioTransport> PlaybackClock<T> {
    pub fn new(transport: T) -> Self {
        let current_time = transport.position();
        Self {
            transport,
            current_time,
            playing: false,
            ended: false,
            owner: ClockOwner::Live,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn duration(&self) -> f64 {
        self.transport.duration()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    pub fn owner(&self) -> ClockOwner {
        self.owner
    }

    /// Starts playback. Returns `false` when already playing or while an export owns the
    /// transport. Playing after the end restarts from zero.
    pub fn play(&mut self) -> bool {
        if self.owner == ClockOwner::Export {
            tracing::warn!("play ignored: transport is owned by an export");
            return false;
        }
        if self.playing {
            return false;
        }
        if self.ended {
            self.transport.set_position(0.0);
            self.current_time = 0.0;
            self.ended = false;
        }
        self.transport.play();
        self.playing = true;
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.transport.pause();
        self.playing = false;
        self.current_time = self.transport.position();
        true
    }

    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Moves to `t` clamped to `[0, duration]` and clears `ended`. Returns the clamped time.
    pub fn seek(&mut self, t: f64) -> f64 {
        let mut t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let d = self.transport.duration();
        if d.is_finite() {
            t = t.min(d.max(0.0));
        }
        self.transport.set_position(t);
        self.current_time = t;
        self.ended = false;
        t
    }

    /// One refresh tick of the live loop. `None` once playback is not running.
    pub fn tick(&mut self) -> Option<f64> {
        if !self.playing {
            return None;
        }
        self.current_time = self.transport.position();
        if self.transport.has_ended() {
            self.transport.pause();
            self.playing = false;
            self.ended = true;
            let d = self.transport.duration();
            if d.is_finite() {
                self.current_time = d;
            }
            tracing::debug!(t = self.current_time, "playback ended");
        }
        Some(self.current_time)
    }

    /// Hands the transport to an export. Playback is paused first.
    pub fn begin_export(&mut self) -> LyricResult<()> {
        if self.owner == ClockOwner::Export {
            return Err(LyricError::validation(
                "the audio transport is already owned by an export",
            ));
        }
        self.pause();
        self.owner = ClockOwner::Export;
        Ok(())
    }

    /// Returns the transport to the live owner in a known idle state: paused at zero.
    pub fn end_export(&mut self) {
        self.transport.pause();
        self.transport.set_position(0.0);
        self.playing = false;
        self.ended = false;
        self.current_time = 0.0;
        self.owner = ClockOwner::Live;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::transport::SimulatedTransport;

    #[test]
    fn play_and_pause_are_idempotent() {
        let mut c = PlaybackClock::new(SimulatedTransport::new(10.0));
        assert!(!c.pause());
        assert!(c.play());
        assert!(!c.play());
        assert!(c.pause());
        assert!(!c.pause());
    }

    #[test]
    fn seek_clamps_and_clears_ended() {
        let mut c = PlaybackClock::new(SimulatedTransport::new(10.0));
        assert_eq!(c.seek(-3.0), 0.0);
        assert_eq!(c.seek(25.0), 10.0);

        c.seek(0.0);
        c.play();
        c.transport_mut().advance(20.0);
        assert_eq!(c.tick(), Some(10.0));
        assert!(c.has_ended());
        assert!(!c.is_playing());
        assert_eq!(c.tick(), None);

        c.seek(4.0);
        assert!(!c.has_ended());
        assert_eq!(c.current_time(), 4.0);
    }

    #[test]
    fn play_after_end_restarts_from_zero() {
        let mut c = PlaybackClock::new(SimulatedTransport::new(2.0));
        c.play();
        c.transport_mut().advance(5.0);
        c.tick();
        assert!(c.has_ended());
        assert!(c.play());
        assert!(!c.has_ended());
        assert!(c.current_time() < 0.5);
    }

    #[test]
    fn export_ownership_blocks_playback_and_resets_on_release() {
        let mut c = PlaybackClock::new(SimulatedTransport::new(10.0));
        c.play();
        c.begin_export().unwrap();
        assert_eq!(c.owner(), ClockOwner::Export);
        assert!(!c.is_playing());
        assert!(!c.play());
        assert!(c.begin_export().is_err());

        c.seek(7.5);
        assert_eq!(c.transport().position(), 7.5);

        c.end_export();
        assert_eq!(c.owner(), ClockOwner::Live);
        assert_eq!(c.current_time(), 0.0);
        assert_eq!(c.transport().position(), 0.0);
        assert!(c.transport().is_paused());
        assert!(c.play());
    }
}
