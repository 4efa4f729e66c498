//! RGBA8 alpha arithmetic shared by cover decoding and frame flattening.
//!
//! All products are rounded to nearest (`(x * y + 127) / 255`), matching what the vello_cpu
//! pixmaps and the PNG frames both expect.

/// `x * y / 255`, rounded to nearest.
#[inline]
pub(crate) fn scale(x: u8, y: u8) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}

/// Converts straight-alpha RGBA8 to premultiplied in place.
pub(crate) fn premultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = scale(*c, a);
        }
    }
}

/// Writes `src` composited over the opaque `matte` into `dst`. Every output alpha is 255.
///
/// Pixels are paired up with `zip`, so a length mismatch stops at the shorter buffer; callers
/// check sizes first.
pub(crate) fn flatten_over(dst: &mut [u8], src: &[u8], premultiplied: bool, matte: [u8; 3]) {
    for (out, px) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = px[3];
        let uncovered = 255 - a;
        for c in 0..3 {
            let fg = if premultiplied { px[c] } else { scale(px[c], a) };
            out[c] = fg.saturating_add(scale(matte[c], uncovered));
        }
        out[3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_rounds_and_zeroes_transparent() {
        let mut px = vec![100u8, 50, 200, 128, 9, 9, 9, 0];
        premultiply(&mut px);
        assert_eq!(px, vec![50, 25, 100, 128, 0, 0, 0, 0]);
    }

    #[test]
    fn flatten_premultiplied_over_white() {
        // Premultiplied red at 50%; the matte fills the uncovered 127/255.
        let mut dst = [0u8; 4];
        flatten_over(&mut dst, &[128, 0, 0, 128], true, [255, 255, 255]);
        assert_eq!(dst, [255, 127, 127, 255]);
    }

    #[test]
    fn flatten_straight_over_black() {
        let mut dst = [0u8; 4];
        flatten_over(&mut dst, &[255, 0, 0, 128], false, [0, 0, 0]);
        assert_eq!(dst, [128, 0, 0, 255]);
    }

    #[test]
    fn opaque_pixels_pass_through() {
        let mut dst = [0u8; 8];
        flatten_over(&mut dst, &[10, 20, 30, 255, 0, 0, 0, 0], true, [1, 2, 3]);
        assert_eq!(dst, [10, 20, 30, 255, 1, 2, 3, 255]);
    }
}
