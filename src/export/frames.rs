use image::ImageEncoder as _;

use crate::{
    foundation::{
        error::{LyricError, LyricResult},
        pixel,
    },
    surface::FrameRGBA,
};

/// Composites `frame` over an opaque matte and encodes it as PNG. `scratch` is reused
/// between frames and resized as needed.
pub(crate) fn encode_frame_png(
    frame: &FrameRGBA,
    matte_rgba: [u8; 4],
    scratch: &mut Vec<u8>,
) -> LyricResult<Vec<u8>> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() != expected {
        return Err(LyricError::encoding(format!(
            "frame data is {} bytes, expected {expected} for {}x{}",
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }
    scratch.resize(expected, 0);
    let [r, g, b, _] = matte_rgba;
    pixel::flatten_over(scratch, &frame.data, frame.premultiplied, [r, g, b]);

    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(
            scratch,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| LyricError::encoding(format!("png encode failed: {e}")))?;
    Ok(png)
}
