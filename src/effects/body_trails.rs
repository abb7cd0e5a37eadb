//! Body Trails effect
//!
//! The segmented body is stamped into the trail buffer at intervals,
//! building up a history of silhouettes filled with live video. The
//! current body is always drawn live on top of the history.

use std::borrow::Cow;

use super::{EffectType, FrameContext, TrailEffect};
use crate::compositor::{apply_person_mask, copy_onto, draw_image, masked_frame, BlendMode, PixelBuffer};
use crate::ml::PersonMask;

/// Body Trails effect runtime
pub struct BodyTrailsEffect {
    /// Capture into the trail every N frames
    frame_skip: u32,
    /// Reusable buffer for the live (current) body
    live_body: PixelBuffer,
    /// Number of silhouettes captured into the trail
    captures: u64,
}

impl BodyTrailsEffect {
    /// Create a new effect instance for video of the given size
    pub fn new(frame_skip: u32, video_width: u32, video_height: u32) -> Self {
        Self {
            frame_skip: frame_skip.max(1),
            live_body: PixelBuffer::new(video_width, video_height),
            captures: 0,
        }
    }

    /// Number of silhouettes captured since creation
    pub fn captures(&self) -> u64 {
        self.captures
    }

    pub fn set_frame_skip(&mut self, frame_skip: u32) {
        self.frame_skip = frame_skip.max(1);
    }
}

/// The mask at the video's resolution
fn conform_mask<'a>(mask: &'a PersonMask, video: &PixelBuffer) -> Cow<'a, PersonMask> {
    if mask.width == video.width() && mask.height == video.height() {
        Cow::Borrowed(mask)
    } else {
        Cow::Owned(mask.resample(video.width(), video.height()))
    }
}

impl TrailEffect for BodyTrailsEffect {
    fn draw(&mut self, ctx: &FrameContext<'_>, trail: &mut PixelBuffer, canvas: &mut PixelBuffer) {
        let segmented = match (ctx.video, ctx.mask) {
            (Some(video), Some(mask)) => Some((video, conform_mask(mask, video))),
            _ => None,
        };

        // Capture to trail buffer every N frames
        if ctx.on_interval(self.frame_skip) {
            if let Some((video, mask)) = &segmented {
                let body = masked_frame(video, mask);
                draw_image(trail, &body, ctx.placement, BlendMode::Normal, None);
                self.captures += 1;
                tracing::trace!(frame = ctx.frame_count, captures = self.captures, "Captured body to trail");
            }
        }

        // Trail history first
        copy_onto(canvas, trail);

        // Live body on top
        if let Some((video, mask)) = &segmented {
            if self.live_body.width() != video.width() || self.live_body.height() != video.height() {
                self.live_body.resize(video.width(), video.height());
            }
            apply_person_mask(video, mask, &mut self.live_body);
            draw_image(canvas, &self.live_body, ctx.placement, BlendMode::Normal, None);
        }
    }

    fn effect_type(&self) -> EffectType {
        EffectType::BodyTrails
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::buffer::OPAQUE_BLACK;
    use crate::compositor::Placement;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];

    /// 2x1 mask with only the left pixel as person
    fn left_mask() -> PersonMask {
        PersonMask {
            data: vec![1, 0],
            width: 2,
            height: 1,
        }
    }

    fn ctx<'a>(frame_count: u64, video: &'a PixelBuffer, mask: Option<&'a PersonMask>) -> FrameContext<'a> {
        FrameContext {
            frame_count,
            hue: 0.0,
            video: Some(video),
            mask,
            placement: Placement::STRETCH,
        }
    }

    #[test]
    fn test_live_body_drawn_without_capture() {
        let mut effect = BodyTrailsEffect::new(15, 2, 1);
        let video = PixelBuffer::filled(2, 1, RED);
        let mask = left_mask();
        let mut trail = PixelBuffer::filled(2, 1, OPAQUE_BLACK);
        let mut canvas = PixelBuffer::new(2, 1);

        effect.draw(&ctx(1, &video, Some(&mask)), &mut trail, &mut canvas);

        assert_eq!(effect.captures(), 0);
        assert_eq!(trail, PixelBuffer::filled(2, 1, OPAQUE_BLACK));
        assert_eq!(canvas.pixel(0, 0), Some(RED));
        assert_eq!(canvas.pixel(1, 0), Some(OPAQUE_BLACK));
    }

    #[test]
    fn test_capture_on_interval_persists() {
        let mut effect = BodyTrailsEffect::new(15, 2, 1);
        let mask = left_mask();
        let mut trail = PixelBuffer::filled(2, 1, OPAQUE_BLACK);
        let mut canvas = PixelBuffer::new(2, 1);

        let red = PixelBuffer::filled(2, 1, RED);
        effect.draw(&ctx(15, &red, Some(&mask)), &mut trail, &mut canvas);
        assert_eq!(effect.captures(), 1);
        assert_eq!(trail.pixel(0, 0), Some(RED));
        assert_eq!(trail.pixel(1, 0), Some(OPAQUE_BLACK));

        // The person moved right; the old silhouette stays in the trail
        let green = PixelBuffer::filled(2, 1, GREEN);
        let moved = PersonMask {
            data: vec![0, 1],
            width: 2,
            height: 1,
        };
        effect.draw(&ctx(16, &green, Some(&moved)), &mut trail, &mut canvas);
        assert_eq!(canvas.pixel(0, 0), Some(RED));
        assert_eq!(canvas.pixel(1, 0), Some(GREEN));
    }

    #[test]
    fn test_no_mask_shows_trail_only() {
        let mut effect = BodyTrailsEffect::new(1, 2, 1);
        let video = PixelBuffer::filled(2, 1, RED);
        let mut trail = PixelBuffer::filled(2, 1, [5, 5, 5, 255]);
        let mut canvas = PixelBuffer::new(2, 1);

        effect.draw(&ctx(1, &video, None), &mut trail, &mut canvas);

        assert_eq!(effect.captures(), 0);
        assert_eq!(canvas, PixelBuffer::filled(2, 1, [5, 5, 5, 255]));
    }

    #[test]
    fn test_mask_resampled_to_video() {
        let mut effect = BodyTrailsEffect::new(1, 4, 2);
        let video = PixelBuffer::filled(4, 2, RED);
        let mut trail = PixelBuffer::filled(4, 2, OPAQUE_BLACK);
        let mut canvas = PixelBuffer::new(4, 2);

        effect.draw(&ctx(1, &video, Some(&left_mask())), &mut trail, &mut canvas);

        assert_eq!(trail.pixel(1, 1), Some(RED));
        assert_eq!(trail.pixel(2, 0), Some(OPAQUE_BLACK));
    }

    #[test]
    fn test_mirrored_capture() {
        let mut effect = BodyTrailsEffect::new(1, 2, 1);
        let video = PixelBuffer::filled(2, 1, RED);
        let mut trail = PixelBuffer::filled(2, 1, OPAQUE_BLACK);
        let mut canvas = PixelBuffer::new(2, 1);
        let mask = left_mask();
        let mirrored = FrameContext {
            placement: Placement::MIRRORED,
            ..ctx(1, &video, Some(&mask))
        };

        effect.draw(&mirrored, &mut trail, &mut canvas);

        assert_eq!(trail.pixel(0, 0), Some(OPAQUE_BLACK));
        assert_eq!(trail.pixel(1, 0), Some(RED));
    }
}
