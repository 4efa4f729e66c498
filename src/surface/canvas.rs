use anyhow::Context as _;
use vello_cpu::{
    kurbo::{Affine, BezPath, Rect, Shape as _, Stroke},
    peniko::{Color, FontData},
};

use crate::{
    foundation::{
        core::Resolution,
        error::{LyricError, LyricResult},
    },
    render::model::{HighlightMode, compute_frame, highlight_fills},
    style::{Palette, Rgba8, Side, VideoStyle},
    surface::{FrameRGBA, RenderSurface, background::load_cover, text::TextLayoutEngine},
    timing::lyric::TimedLyric,
};

/// Lyric font size is authored against a 1080-pixel-high frame.
const REFERENCE_HEIGHT: f32 = 1080.0;
/// Darkening veil over a background image (alpha 0.4).
const VEIL_ALPHA: u8 = 102;

struct CanvasFont {
    engine: TextLayoutEngine,
    data: FontData,
}

impl CanvasFont {
    fn from_bytes(bytes: Vec<u8>) -> LyricResult<Self> {
        let engine = TextLayoutEngine::new(&bytes)?;
        let data = FontData::new(vello_cpu::peniko::Blob::from(bytes), 0);
        Ok(Self { engine, data })
    }
}

/// CPU lyric-video canvas: background, album art, song info, the scrolling lyric window
/// with its karaoke highlight, and optionally the player overlay.
///
/// Drawing is a function of `(style, timeline, t)` only, so the same time always yields the
/// same pixels whether it is reached by playback or by seeking.
pub struct LyricCanvas {
    resolution: Resolution,
    style: VideoStyle,
    timeline: Vec<TimedLyric>,
    duration: Option<f64>,
    font: Option<CanvasFont>,
    background: Option<vello_cpu::Image>,
    album_art: Option<vello_cpu::Image>,
    pixmap: vello_cpu::Pixmap,
    generation: u64,
    dirty: bool,
    drawn_at: Option<f64>,
    overlay_visible: bool,
}

impl LyricCanvas {
    /// Loads every asset the style names. A style without a font draws no text.
    pub fn new(
        resolution: Resolution,
        style: VideoStyle,
        timeline: Vec<TimedLyric>,
    ) -> LyricResult<Self> {
        resolution.validate()?;
        style.validate()?;
        let (w, h) = pixmap_size(resolution)?;

        let font = match &style.font {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("read font '{}'", path.display()))?;
                Some(CanvasFont::from_bytes(bytes)?)
            }
            None => {
                tracing::warn!("no font configured; text will not be drawn");
                None
            }
        };

        let background = style
            .background_image
            .as_deref()
            .map(|p| load_cover(p, resolution.width, resolution.height))
            .transpose()?;

        let album_art = match style
            .album_art
            .image
            .as_deref()
            .or(style.background_image.as_deref())
        {
            Some(p) if style.album_art.enabled => {
                let side = album_art_side(&style, resolution);
                Some(load_cover(p, side, side)?)
            }
            _ => None,
        };

        let overlay_visible = style.show_overlay;
        Ok(Self {
            resolution,
            style,
            timeline,
            duration: None,
            font,
            background,
            album_art,
            pixmap: vello_cpu::Pixmap::new(w, h),
            generation: 0,
            dirty: true,
            drawn_at: None,
            overlay_visible,
        })
    }

    /// Replaces the configured font with in-memory font bytes.
    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> LyricResult<Self> {
        self.font = Some(CanvasFont::from_bytes(bytes)?);
        self.dirty = true;
        Ok(self)
    }

    pub fn style(&self) -> &VideoStyle {
        &self.style
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn font_family(&self) -> Option<&str> {
        self.font.as_ref().map(|f| f.engine.family_name())
    }

    pub fn timeline(&self) -> &[TimedLyric] {
        &self.timeline
    }

    pub fn set_timeline(&mut self, timeline: Vec<TimedLyric>) {
        self.timeline = timeline;
        self.dirty = true;
    }

    /// Media length used by the overlay's progress bar.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
        self.dirty = true;
    }

    /// Draws time `t` and returns the pixels.
    pub fn render_at(&mut self, t: f64) -> LyricResult<FrameRGBA> {
        self.request_redraw();
        self.pump(t)?;
        self.capture()
    }

    #[tracing::instrument(level = "trace", skip(self))]
    fn draw(&mut self, t: f64) -> LyricResult<()> {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let geom = Geometry::new(&self.style, f64::from(w), f64::from(h));
        let palette = self.style.palette();
        let full = Rect::new(0.0, 0.0, geom.width, geom.height);

        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(Affine::IDENTITY);
        ctx.set_paint(paint(self.style.background));
        ctx.fill_rect(&full);

        if let Some(bg) = &self.background {
            ctx.set_paint(bg.clone());
            ctx.fill_rect(&full);
            ctx.set_paint(Color::from_rgba8(0, 0, 0, VEIL_ALPHA));
            ctx.fill_rect(&full);
        }

        if let Some(art) = &self.album_art {
            let side = f64::from(album_art_side(&self.style, self.resolution));
            let x = match self.style.album_art.side {
                Side::Right => geom.width * 0.95 - side,
                Side::Left => geom.width * 0.05,
            };
            let y = (geom.height - side) / 2.0;
            ctx.set_transform(Affine::translate((x, y)));
            ctx.set_paint(art.clone());
            ctx.fill_rect(&Rect::new(0.0, 0.0, side, side));
        }

        if let Some(font) = &mut self.font {
            draw_song_info(&mut ctx, font, &self.style, &palette, &geom)?;
            draw_lyrics(&mut ctx, font, &self.style, &palette, &self.timeline, t, &geom)?;
        }

        if self.overlay_visible {
            draw_overlay(&mut ctx, &palette, t, self.duration, &geom);
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);
        Ok(())
    }
}

impl RenderSurface for LyricCanvas {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn request_redraw(&mut self) {
        self.dirty = true;
    }

    fn pump(&mut self, t: f64) -> LyricResult<()> {
        if !self.dirty && self.drawn_at == Some(t) {
            return Ok(());
        }
        self.draw(t)?;
        self.generation += 1;
        self.dirty = false;
        self.drawn_at = Some(t);
        Ok(())
    }

    fn capture(&mut self) -> LyricResult<FrameRGBA> {
        Ok(FrameRGBA {
            width: u32::from(self.pixmap.width()),
            height: u32::from(self.pixmap.height()),
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    fn set_overlay_visible(&mut self, visible: bool) {
        if self.overlay_visible != visible {
            self.overlay_visible = visible;
            self.dirty = true;
        }
    }
}

struct Geometry {
    width: f64,
    height: f64,
    /// Horizontal centre of the lyric column.
    lyric_center_x: f64,
}

impl Geometry {
    fn new(style: &VideoStyle, width: f64, height: f64) -> Self {
        let (x, w) = match (style.album_art.enabled, style.album_art.side) {
            (true, Side::Right) => (width * 0.05, width * 0.55),
            (true, Side::Left) => (width * 0.40, width * 0.55),
            (false, _) => (width * 0.05, width * 0.9),
        };
        Self {
            width,
            height,
            lyric_center_x: x + w / 2.0,
        }
    }
}

fn pixmap_size(resolution: Resolution) -> LyricResult<(u16, u16)> {
    let w: u16 = resolution
        .width
        .try_into()
        .map_err(|_| LyricError::validation("canvas width exceeds u16"))?;
    let h: u16 = resolution
        .height
        .try_into()
        .map_err(|_| LyricError::validation("canvas height exceeds u16"))?;
    Ok((w, h))
}

fn album_art_side(style: &VideoStyle, resolution: Resolution) -> u32 {
    let side = f64::from(resolution.height) * f64::from(style.album_art.size_percent) / 100.0;
    (side.round() as u32).max(1)
}

fn paint(c: Rgba8) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn draw_song_info(
    ctx: &mut vello_cpu::RenderContext,
    font: &mut CanvasFont,
    style: &VideoStyle,
    palette: &Palette,
    geom: &Geometry,
) -> LyricResult<()> {
    let info_size = (geom.height * 0.03) as f32;
    let sub_size = (geom.height * 0.025) as f32;
    let x = geom.width * 0.05;
    let bottom = geom.height * 0.95;

    if !style.title.is_empty() {
        let layout = font
            .engine
            .layout_plain(&style.title, info_size, palette.info)?;
        let y = bottom - f64::from(sub_size) * 1.2 - f64::from(layout.height());
        ctx.set_transform(Affine::translate((x, y)));
        fill_layout(ctx, &font.data, &layout, None);
    }
    if !style.artist.is_empty() {
        let layout = font
            .engine
            .layout_plain(&style.artist, sub_size, palette.sub_info)?;
        ctx.set_transform(Affine::translate((x, bottom - f64::from(layout.height()))));
        fill_layout(ctx, &font.data, &layout, None);
    }
    Ok(())
}

fn draw_lyrics(
    ctx: &mut vello_cpu::RenderContext,
    font: &mut CanvasFont,
    style: &VideoStyle,
    palette: &Palette,
    timeline: &[TimedLyric],
    t: f64,
    geom: &Geometry,
) -> LyricResult<()> {
    let state = compute_frame(timeline, t, style.ease);
    let base_size = geom.height as f32 * (style.font_size / REFERENCE_HEIGHT);
    let line_height = f64::from(base_size) * 1.5;

    for placed in state.placements(timeline, style.window, line_height) {
        if placed.text.trim().is_empty() || placed.scale <= 0.0 || placed.opacity <= 0.0 {
            continue;
        }
        let size = base_size * placed.scale as f32;
        let colour = if placed.is_near && !placed.is_active {
            palette.inactive_near
        } else {
            palette.inactive_far
        };
        let layout = font.engine.layout_plain(placed.text, size, colour)?;
        let text_w = f64::from(layout.full_width());
        let text_h = f64::from(layout.height());
        let x = geom.lyric_center_x - text_w / 2.0;
        let y = geom.height / 2.0 + placed.y_offset - text_h / 2.0;
        ctx.set_transform(Affine::translate((x, y)));

        let faded = placed.opacity < 1.0;
        if faded {
            ctx.push_opacity_layer(placed.opacity as f32);
        }
        if style.stroke_width > 0.0 {
            let width = f64::from(style.stroke_width * 2.0 * (base_size / 48.0));
            stroke_layout(ctx, &font.data, &layout, style.stroke_color, width);
        }
        fill_layout(ctx, &font.data, &layout, None);

        if placed.is_active
            && let Some(clip) = highlight_clip(
                &mut font.engine,
                placed.text,
                size,
                state.karaoke_progress,
                style.highlight,
                text_h,
            )?
        {
            ctx.push_clip_layer(&clip);
            fill_layout(ctx, &font.data, &layout, Some(palette.active));
            ctx.pop_layer();
        }
        if faded {
            ctx.pop_layer();
        }
    }
    Ok(())
}

/// Region of the active line already sung, in layout coordinates. `None` when empty.
fn highlight_clip(
    engine: &mut TextLayoutEngine,
    text: &str,
    size: f32,
    progress: f64,
    mode: HighlightMode,
    text_h: f64,
) -> LyricResult<Option<BezPath>> {
    let mut path = BezPath::new();
    let mut consumed = 0usize;
    let mut x_start = 0.0;
    for token in highlight_fills(text, progress, mode) {
        consumed += token.text.len();
        let x_end = f64::from(engine.measure(&text[..consumed], size)?);
        if token.fill > 0.0 {
            let right = x_start + (x_end - x_start) * token.fill;
            path.extend(Rect::new(x_start, -text_h * 0.5, right, text_h * 1.5).path_elements(0.1));
        }
        x_start = x_end;
    }
    Ok((!path.elements().is_empty()).then_some(path))
}

fn fill_layout(
    ctx: &mut vello_cpu::RenderContext,
    font: &FontData,
    layout: &parley::Layout<Rgba8>,
    colour: Option<Rgba8>,
) {
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            ctx.set_paint(paint(colour.unwrap_or(run.style().brush)));
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn stroke_layout(
    ctx: &mut vello_cpu::RenderContext,
    font: &FontData,
    layout: &parley::Layout<Rgba8>,
    colour: Rgba8,
    width: f64,
) {
    ctx.set_stroke(Stroke::new(width));
    ctx.set_paint(paint(colour));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .stroke_glyphs(glyphs);
        }
    }
}

/// Progress bar of the player controls.
fn draw_overlay(
    ctx: &mut vello_cpu::RenderContext,
    palette: &Palette,
    t: f64,
    duration: Option<f64>,
    geom: &Geometry,
) {
    let bar_h = (geom.height * 0.008).max(2.0);
    let margin = geom.width * 0.05;
    let y = geom.height - bar_h * 3.0;
    ctx.set_transform(Affine::IDENTITY);
    ctx.set_paint(Color::from_rgba8(255, 255, 255, 64));
    ctx.fill_rect(&Rect::new(margin, y, geom.width - margin, y + bar_h));

    if let Some(d) = duration {
        let frac = (t / d).clamp(0.0, 1.0);
        if frac > 0.0 {
            ctx.set_paint(paint(palette.active));
            let right = margin + (geom.width - 2.0 * margin) * frac;
            ctx.fill_rect(&Rect::new(margin, y, right, y + bar_h));
        }
    }
}
