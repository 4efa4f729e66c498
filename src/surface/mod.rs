//! Where frames come from.
//!
//! The export loop only talks to a [`RenderSurface`]: it asks for a redraw, lets the surface
//! catch up with the clock, and reads pixels back. [`canvas::LyricCanvas`] is the built-in
//! CPU implementation.

pub(crate) mod background;
pub mod canvas;
pub(crate) mod text;

use crate::{
    export::frames::encode_frame_png,
    foundation::{core::Resolution, error::LyricResult},
    style::Rgba8,
};

#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Opaque PNG of the frame, with transparent pixels composited over `matte`.
    pub fn to_png(&self, matte: Rgba8) -> LyricResult<Vec<u8>> {
        let mut scratch = Vec::new();
        encode_frame_png(self, matte.to_array(), &mut scratch)
    }
}

/// A drawable view of the lyric timeline.
///
/// Surfaces redraw lazily. After [`request_redraw`](Self::request_redraw) the next
/// [`pump`](Self::pump) must draw, and every completed draw bumps
/// [`generation`](Self::generation). The exporter uses that counter to know a capture
/// reflects the time it just seeked to.
pub trait RenderSurface {
    fn resolution(&self) -> Resolution;

    /// Count of completed redraws. Never decreases.
    fn generation(&self) -> u64;

    fn request_redraw(&mut self);

    /// One display refresh at playback time `t`. Draws if a redraw is pending or `t` moved.
    fn pump(&mut self, t: f64) -> LyricResult<()>;

    /// Pixels of the most recent draw.
    fn capture(&mut self) -> LyricResult<FrameRGBA>;

    fn overlay_visible(&self) -> bool;

    /// Shows or hides the interactive controls. Hidden controls never appear in captures.
    fn set_overlay_visible(&mut self, visible: bool);
}
