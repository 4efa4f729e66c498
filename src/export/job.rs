use std::collections::BTreeSet;

use crate::{
    encode::Encoder,
    foundation::{
        core::{FrameIndex, Fps},
        error::{LyricError, LyricResult},
    },
};

/// Name of the audio entry inside the encoder filesystem.
pub const AUDIO_FILE: &str = "audio.dat";
/// Name of the muxed container inside the encoder filesystem.
pub const OUTPUT_FILE: &str = "output.mp4";

/// Bookkeeping for one `export_video` call: the frame grid and every encoder entry created,
/// so all of them can be purged however the call ends.
#[derive(Clone, Debug)]
pub struct ExportJob {
    fps: Fps,
    total_frames: u64,
    current_frame: u64,
    frame_digits: usize,
    created: BTreeSet<String>,
}

impl ExportJob {
    /// `total_frames = floor(duration * fps)`. The duration must be finite and long enough for
    /// one frame.
    pub fn new(duration_secs: f64, fps: Fps) -> LyricResult<Self> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(LyricError::invalid_media(format!(
                "audio duration must be finite and > 0 (got {duration_secs})"
            )));
        }
        let total_frames = fps.secs_to_frames_floor(duration_secs);
        if total_frames == 0 {
            return Err(LyricError::invalid_media(format!(
                "audio duration {duration_secs}s is shorter than one frame at {} fps",
                fps.ffmpeg_rate()
            )));
        }
        let frame_digits = (total_frames - 1).to_string().len().max(5);
        Ok(Self {
            fps,
            total_frames,
            current_frame: 0,
            frame_digits,
            created: BTreeSet::new(),
        })
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frames captured so far.
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub(crate) fn advance(&mut self) {
        self.current_frame += 1;
    }

    pub fn frame_time(&self, frame: u64) -> f64 {
        self.fps.frame_to_secs(FrameIndex(frame))
    }

    pub fn frame_name(&self, frame: u64) -> String {
        format!("frame{frame:0width$}.png", width = self.frame_digits)
    }

    /// printf pattern matching [`frame_name`](Self::frame_name).
    pub fn frame_pattern(&self) -> String {
        format!("frame%0{}d.png", self.frame_digits)
    }

    pub fn record(&mut self, name: impl Into<String>) {
        self.created.insert(name.into());
    }

    pub fn created(&self) -> &BTreeSet<String> {
        &self.created
    }

    /// Removes every recorded entry still present and checks the listing afterwards.
    pub fn purge(&mut self, encoder: &mut dyn Encoder) -> LyricResult<()> {
        let listing: BTreeSet<String> = encoder.list_files()?.into_iter().collect();
        let mut removed = 0usize;
        for name in self.created.intersection(&listing) {
            match encoder.unlink(name) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(entry = %name, "failed to unlink encoder entry: {e}"),
            }
        }

        let residual: Vec<String> = encoder
            .list_files()?
            .into_iter()
            .filter(|n| self.created.contains(n))
            .collect();
        tracing::debug!(removed, residual = residual.len(), "purged export entries");
        if !residual.is_empty() {
            return Err(LyricError::encoding(format!(
                "{} encoder entries survived cleanup (first: {})",
                residual.len(),
                residual[0]
            )));
        }
        self.created.clear();
        Ok(())
    }
}
