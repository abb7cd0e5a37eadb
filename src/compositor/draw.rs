//! Scaled and mirrored image draws
//!
//! The sketches draw the 640x480 video into window-sized surfaces with
//! `translate(width, 0); scale(-width / 640, height / 480)`, i.e. stretched
//! to fill and flipped horizontally like a mirror. Sampling is
//! nearest-neighbour.

use super::blend::BlendMode;
use super::buffer::PixelBuffer;
use super::color::Tint;

/// How a source image is placed onto a destination surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Flip horizontally (selfie view)
    pub mirror_x: bool,
}

impl Placement {
    /// Stretch to fill, mirrored
    pub const MIRRORED: Placement = Placement { mirror_x: true };
    /// Stretch to fill, unmirrored
    pub const STRETCH: Placement = Placement { mirror_x: false };
}

impl Default for Placement {
    fn default() -> Self {
        Self::MIRRORED
    }
}

/// Source column for each destination column
fn column_map(src_width: u32, dst_width: u32, mirror_x: bool) -> Vec<u32> {
    (0..dst_width)
        .map(|x| {
            let sx = ((x as u64 * src_width as u64) / dst_width as u64) as u32;
            let sx = sx.min(src_width - 1);
            if mirror_x {
                src_width - 1 - sx
            } else {
                sx
            }
        })
        .collect()
}

/// Draw `src` onto `dst`, stretched to cover all of `dst`
pub fn draw_image(
    dst: &mut PixelBuffer,
    src: &PixelBuffer,
    placement: Placement,
    blend: BlendMode,
    tint: Option<Tint>,
) {
    let (dst_w, dst_h) = (dst.width(), dst.height());
    let (src_w, src_h) = (src.width(), src.height());
    let columns = column_map(src_w, dst_w, placement.mirror_x);

    let src_bytes = src.as_bytes();
    let dst_bytes = dst.as_bytes_mut();

    for y in 0..dst_h {
        let sy = (((y as u64 * src_h as u64) / dst_h as u64) as u32).min(src_h - 1);
        let src_row = sy as usize * src_w as usize * 4;
        let dst_row = y as usize * dst_w as usize * 4;

        for (x, &sx) in columns.iter().enumerate() {
            let si = src_row + sx as usize * 4;
            let mut px = [
                src_bytes[si],
                src_bytes[si + 1],
                src_bytes[si + 2],
                src_bytes[si + 3],
            ];
            if let Some(tint) = tint {
                px = tint.apply(px);
            }
            if px[3] == 0 {
                continue;
            }

            let di = dst_row + x * 4;
            let backdrop = [
                dst_bytes[di],
                dst_bytes[di + 1],
                dst_bytes[di + 2],
                dst_bytes[di + 3],
            ];
            dst_bytes[di..di + 4].copy_from_slice(&blend.blend_pixel(px, backdrop));
        }
    }
}

/// Draw `src` onto `dst` at the origin without scaling (source-over).
///
/// Sizes normally match; otherwise only the overlapping region is drawn.
pub fn copy_onto(dst: &mut PixelBuffer, src: &PixelBuffer) {
    let w = dst.width().min(src.width()) as usize;
    let h = dst.height().min(src.height());
    let src_stride = src.width() as usize * 4;
    let dst_stride = dst.width() as usize * 4;

    let src_bytes = src.as_bytes();
    let dst_bytes = dst.as_bytes_mut();

    for y in 0..h as usize {
        let src_row = &src_bytes[y * src_stride..y * src_stride + w * 4];
        let dst_row = &mut dst_bytes[y * dst_stride..y * dst_stride + w * 4];

        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            match s[3] {
                255 => d.copy_from_slice(s),
                0 => {}
                _ => {
                    let out = BlendMode::Normal.blend_pixel(
                        [s[0], s[1], s[2], s[3]],
                        [d[0], d[1], d[2], d[3]],
                    );
                    d.copy_from_slice(&out);
                }
            }
        }
    }
}
