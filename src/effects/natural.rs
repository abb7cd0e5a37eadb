//! Natural Layers effect
//!
//! Untinted frames lightened into the trail every N frames.

use super::{EffectType, FrameContext, TrailEffect};
use crate::compositor::{copy_onto, draw_image, BlendMode, PixelBuffer};

/// Natural Layers effect runtime
pub struct NaturalEffect {
    frame_skip: u32,
}

impl NaturalEffect {
    pub fn new(frame_skip: u32) -> Self {
        Self {
            frame_skip: frame_skip.max(1),
        }
    }

    pub fn set_frame_skip(&mut self, frame_skip: u32) {
        self.frame_skip = frame_skip.max(1);
    }
}

impl Default for NaturalEffect {
    fn default() -> Self {
        Self::new(EffectType::Natural.default_settings().frame_skip)
    }
}

impl TrailEffect for NaturalEffect {
    fn draw(&mut self, ctx: &FrameContext<'_>, trail: &mut PixelBuffer, canvas: &mut PixelBuffer) {
        if ctx.on_interval(self.frame_skip) {
            if let Some(video) = ctx.video {
                draw_image(trail, video, ctx.placement, BlendMode::Lighten, None);
            }
        }

        copy_onto(canvas, trail);
    }

    fn effect_type(&self) -> EffectType {
        EffectType::Natural
    }
}
