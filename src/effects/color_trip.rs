//! Color Trip effect
//!
//! Every frame is tinted with a slowly rotating hue and lightened into the
//! trail, so bright regions leave rainbow streaks.

use super::{EffectType, FrameContext, TrailEffect};
use crate::compositor::{copy_onto, draw_image, BlendMode, PixelBuffer, Tint};

/// Default tint saturation (0-100)
pub const DEFAULT_TINT_SATURATION: f32 = 70.0;
/// Default tint brightness (0-100)
pub const DEFAULT_TINT_BRIGHTNESS: f32 = 100.0;

/// Color Trip effect runtime
pub struct ColorTripEffect {
    frame_skip: u32,
    saturation: f32,
    brightness: f32,
}

impl ColorTripEffect {
    pub fn new(frame_skip: u32) -> Self {
        Self {
            frame_skip: frame_skip.max(1),
            saturation: DEFAULT_TINT_SATURATION,
            brightness: DEFAULT_TINT_BRIGHTNESS,
        }
    }

    /// Set tint saturation and brightness (0-100)
    pub fn set_tint(&mut self, saturation: f32, brightness: f32) {
        self.saturation = saturation.clamp(0.0, 100.0);
        self.brightness = brightness.clamp(0.0, 100.0);
    }

    pub fn set_frame_skip(&mut self, frame_skip: u32) {
        self.frame_skip = frame_skip.max(1);
    }

    /// Tint for a given hue
    pub fn tint(&self, hue: f32) -> Tint {
        Tint::from_hsb(hue, self.saturation, self.brightness, 100.0)
    }
}

impl Default for ColorTripEffect {
    fn default() -> Self {
        Self::new(EffectType::ColorTrip.default_settings().frame_skip)
    }
}

impl TrailEffect for ColorTripEffect {
    fn draw(&mut self, ctx: &FrameContext<'_>, trail: &mut PixelBuffer, canvas: &mut PixelBuffer) {
        if ctx.on_interval(self.frame_skip) {
            if let Some(video) = ctx.video {
                draw_image(trail, video, ctx.placement, BlendMode::Lighten, Some(self.tint(ctx.hue)));
            }
        }

        copy_onto(canvas, trail);
    }

    fn effect_type(&self) -> EffectType {
        EffectType::ColorTrip
    }
}
