use crate::{
    foundation::error::{LyricError, LyricResult},
    style::Rgba8,
};

/// Parley layout state bound to a single font face.
///
/// The font is registered once; every layout afterwards resolves to that family.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
    family_name: String,
}

impl TextLayoutEngine {
    pub(crate) fn new(font_bytes: &[u8]) -> LyricResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            LyricError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| LyricError::validation("registered font family has no name"))?
            .to_string();

        tracing::debug!(family = %family_name, "registered lyric font");
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Shapes `text` on a single unbroken line.
    pub(crate) fn layout_plain(
        &mut self,
        text: &str,
        size_px: f32,
        brush: Rgba8,
    ) -> LyricResult<parley::Layout<Rgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(LyricError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<Rgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Advance width of `text`, trailing whitespace included.
    pub(crate) fn measure(&mut self, text: &str, size_px: f32) -> LyricResult<f32> {
        if text.is_empty() {
            return Ok(0.0);
        }
        Ok(self.layout_plain(text, size_px, Rgba8::default())?.full_width())
    }
}
