//! Segmentation mask compositing
//!
//! Rewrites the alpha channel of a frame from a person mask: person pixels
//! take the video color at full opacity, background pixels become
//! transparent.

use super::buffer::PixelBuffer;
use crate::ml::PersonMask;

/// Copy person pixels from `video` into `out` and make the rest transparent.
///
/// `video`, `mask` and `out` are expected to share dimensions. Pixels of
/// `out` not covered by both the mask and the video are made transparent.
/// Background pixels keep whatever color `out` already had; only their
/// alpha is cleared.
pub fn apply_person_mask(video: &PixelBuffer, mask: &PersonMask, out: &mut PixelBuffer) {
    let src = video.as_bytes();
    let dst = out.as_bytes_mut();

    let mut covered = 0;
    for ((d, s), &m) in dst
        .chunks_exact_mut(4)
        .zip(src.chunks_exact(4))
        .zip(mask.data.iter())
    {
        if m == 1 {
            d[0] = s[0];
            d[1] = s[1];
            d[2] = s[2];
            d[3] = 255;
        } else {
            d[3] = 0;
        }
        covered += 1;
    }

    for d in dst.chunks_exact_mut(4).skip(covered) {
        d[3] = 0;
    }
}

/// Build a fresh masked frame the size of `video`
pub fn masked_frame(video: &PixelBuffer, mask: &PersonMask) -> PixelBuffer {
    let mut out = PixelBuffer::new(video.width(), video.height());
    apply_person_mask(video, mask, &mut out);
    out
}
