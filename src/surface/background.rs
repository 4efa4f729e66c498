use std::{path::Path, sync::Arc};

use anyhow::Context as _;

use crate::foundation::{
    error::{LyricError, LyricResult},
    pixel,
};

/// Decodes `bytes` and scales it to cover `width`x`height`, cropping the overflow evenly on
/// both sides. The result is a ready-to-paint premultiplied image.
pub(crate) fn decode_cover(bytes: &[u8], width: u32, height: u32) -> LyricResult<vello_cpu::Image> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let covered = dyn_img.resize_to_fill(width, height, image::imageops::FilterType::Triangle);
    let rgba = covered.to_rgba8();
    let (w, h) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    pixel::premultiply(&mut rgba8_premul);

    let pixmap = premul_bytes_to_pixmap(&rgba8_premul, w, h)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

pub(crate) fn load_cover(path: &Path, width: u32, height: u32) -> LyricResult<vello_cpu::Image> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_cover(&bytes, width, height)
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> LyricResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| LyricError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| LyricError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(LyricError::validation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn cover_matches_requested_size() {
        let image = decode_cover(&png(40, 10, [10, 20, 30, 255]), 16, 16).unwrap();
        let vello_cpu::ImageSource::Pixmap(p) = &image.image else {
            panic!("expected pixmap source");
        };
        assert_eq!((p.width(), p.height()), (16, 16));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_cover(b"not an image", 4, 4).is_err());
    }
}
