//! Lyricframe turns a song and its lyrics into a lyric video.
//!
//! The crate is organised around one timeline of [`TimedLyric`]s:
//!
//! - Build it by tapping along to the song ([`TimingSession`]) or import it from SRT
//!   ([`timing::timecode`]).
//! - Derive what a frame should show at any instant ([`render::model::compute_frame`]).
//! - Preview it against a playing clock ([`PlaybackClock`], [`LivePreview`]).
//! - Export it frame by frame into an MP4 ([`ExportPipeline`]).
#![forbid(unsafe_code)]

mod foundation;

pub mod encode;
pub mod export;
pub mod playback;
pub mod render;
pub mod style;
pub mod surface;
pub mod timing;

pub use crate::encode::{Encoder, EncoderLoader, MuxRequest};
pub use crate::export::{
    AudioSource, CancelToken, ExportJob, ExportOptions, ExportOutcome, ExportPipeline,
    ProgressBands, SettlePolicy, TrackMetadata,
};
pub use crate::foundation::core::{Fps, FrameIndex, Resolution};
pub use crate::foundation::error::{LyricError, LyricResult};
pub use crate::playback::{
    clock::{ClockOwner, PlaybackClock},
    preview::{LivePreview, PreviewTick},
    transport::{AudioTransport, SimulatedTransport},
};
pub use crate::render::{
    ease::Ease,
    model::{FrameState, HighlightMode, WindowMode, compute_frame},
};
pub use crate::style::{Rgba8, Theme, VideoStyle};
pub use crate::surface::{FrameRGBA, RenderSurface, canvas::LyricCanvas};
pub use crate::timing::{
    lyric::TimedLyric,
    session::{OrderingConflict, TimingSession},
};
