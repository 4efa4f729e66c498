//! Encoder backends.
//!
//! An [`Encoder`] owns a small private filesystem: the exporter writes frames and audio into
//! it by bare file name, asks it to mux, then reads the container back. The indirection keeps
//! the export loop independent of where encoding actually happens.

pub mod ffmpeg;
pub mod probe;

use crate::foundation::{
    core::Fps,
    error::{LyricError, LyricResult},
};

/// One mux invocation: an image sequence plus an audio track into an MP4.
#[derive(Clone, Debug, PartialEq)]
pub struct MuxRequest {
    pub fps: Fps,
    /// printf-style pattern of the frame files, e.g. `frame%05d.png`.
    pub frame_pattern: String,
    pub audio_file: String,
    pub output_file: String,
    pub audio_bitrate_kbps: u32,
    /// Expected output length; lets backends turn timestamps into a ratio.
    pub duration_secs: f64,
}

impl MuxRequest {
    /// ffmpeg-compatible argument list, without the binary or global flags.
    pub fn to_args(&self) -> Vec<String> {
        let rate = self.fps.ffmpeg_rate();
        let bitrate = format!("{}k", self.audio_bitrate_kbps);
        [
            "-framerate",
            rate.as_str(),
            "-i",
            self.frame_pattern.as_str(),
            "-i",
            self.audio_file.as_str(),
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-crf",
            "18",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
            "-b:a",
            bitrate.as_str(),
            "-shortest",
            "-movflags",
            "+faststart",
            self.output_file.as_str(),
        ]
        .into_iter()
        .map(str::to_owned)
        .collect()
    }
}

pub trait Encoder {
    /// Backend description for logs (binary and version).
    fn describe(&self) -> String;

    fn write_file(&mut self, name: &str, data: &[u8]) -> LyricResult<()>;

    fn read_file(&mut self, name: &str) -> LyricResult<Vec<u8>>;

    fn unlink(&mut self, name: &str) -> LyricResult<()>;

    /// Entries currently stored, sorted by name.
    fn list_files(&self) -> LyricResult<Vec<String>>;

    /// Runs the mux. `on_ratio` receives completion in `[0, 1]` as the backend learns it.
    fn mux(&mut self, request: &MuxRequest, on_ratio: &mut dyn FnMut(f64)) -> LyricResult<()>;
}

/// Produces an initialized [`Encoder`]. Loading may be slow or fail when the backend's
/// resources are unreachable; such failures are [`LyricError::EncoderInitialization`].
pub trait EncoderLoader {
    fn load(&self) -> LyricResult<Box<dyn Encoder>>;
}

/// Entry names are flat: no separators, no parent references.
pub fn validate_entry_name(name: &str) -> LyricResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(LyricError::validation(format!(
            "invalid encoder file name '{name}'"
        )));
    }
    Ok(())
}
