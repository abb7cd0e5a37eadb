//! Effects module
//!
//! The switchable trail effects. Each effect draws into the persistent
//! trail buffer and composes the visible canvas from it.

pub mod body_trails;
pub mod color_trip;
pub mod natural;

pub use body_trails::BodyTrailsEffect;
pub use color_trip::ColorTripEffect;
pub use natural::NaturalEffect;

use serde::{Deserialize, Serialize};

use crate::compositor::{PixelBuffer, Placement};
use crate::ml::PersonMask;

/// Effect types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectType {
    /// Segmented body silhouettes captured into the trail, live body on top
    #[default]
    #[serde(rename = "trails2")]
    BodyTrails,
    /// Every frame lightened into the trail with a hue-cycling tint
    #[serde(rename = "colortrip")]
    ColorTrip,
    /// Untinted frames lightened into the trail at intervals
    #[serde(rename = "natural")]
    Natural,
}

impl EffectType {
    /// Stable identifier used in settings and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            EffectType::BodyTrails => "trails2",
            EffectType::ColorTrip => "colortrip",
            EffectType::Natural => "natural",
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            EffectType::BodyTrails => "Body Trails",
            EffectType::ColorTrip => "Color Trip",
            EffectType::Natural => "Natural Layers",
        }
    }

    /// Default capture interval and model requirement
    pub fn default_settings(&self) -> EffectSettings {
        match self {
            EffectType::BodyTrails => EffectSettings {
                frame_skip: 15,
                needs_segmentation: true,
            },
            EffectType::ColorTrip => EffectSettings {
                frame_skip: 1,
                needs_segmentation: false,
            },
            EffectType::Natural => EffectSettings {
                frame_skip: 12,
                needs_segmentation: false,
            },
        }
    }

    /// Whether this effect needs the segmentation model
    pub fn needs_segmentation(&self) -> bool {
        self.default_settings().needs_segmentation
    }

    /// Get all effects in selection order (keys 1-3)
    pub fn all() -> &'static [EffectType] {
        &[EffectType::BodyTrails, EffectType::ColorTrip, EffectType::Natural]
    }

    /// Effect at a zero-based selection index
    pub fn from_index(index: usize) -> Option<EffectType> {
        Self::all().get(index).copied()
    }
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for EffectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trails2" | "trails" | "body" => Ok(EffectType::BodyTrails),
            "colortrip" | "color-trip" => Ok(EffectType::ColorTrip),
            "natural" => Ok(EffectType::Natural),
            other => Err(format!(
                "unknown effect '{}' (expected trails2, colortrip or natural)",
                other
            )),
        }
    }
}

/// Per-effect timing and requirements
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectSettings {
    /// Capture into the trail every N frames
    pub frame_skip: u32,
    /// Effect cannot render until the segmentation model is ready
    pub needs_segmentation: bool,
}

/// Inputs for one frame
pub struct FrameContext<'a> {
    /// Number of frames drawn so far, including this one
    pub frame_count: u64,
    /// Current hue for tinting effects (degrees)
    pub hue: f32,
    /// Latest video frame at the sketch's video size
    pub video: Option<&'a PixelBuffer>,
    /// Latest person mask, matching the video size
    pub mask: Option<&'a PersonMask>,
    /// How video frames are placed on window-sized surfaces
    pub placement: Placement,
}

impl FrameContext<'_> {
    /// Whether this frame falls on a capture interval
    pub fn on_interval(&self, frame_skip: u32) -> bool {
        self.frame_count % u64::from(frame_skip.max(1)) == 0
    }
}

/// A trail effect
pub trait TrailEffect: Send {
    /// Draw one frame: update `trail` and compose `canvas`
    fn draw(&mut self, ctx: &FrameContext<'_>, trail: &mut PixelBuffer, canvas: &mut PixelBuffer);

    /// Get the effect type identifier
    fn effect_type(&self) -> EffectType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        assert_eq!(EffectType::BodyTrails.default_settings().frame_skip, 15);
        assert!(EffectType::BodyTrails.needs_segmentation());
        assert_eq!(EffectType::ColorTrip.default_settings().frame_skip, 1);
        assert!(!EffectType::ColorTrip.needs_segmentation());
        assert_eq!(EffectType::Natural.default_settings().frame_skip, 12);
        assert!(!EffectType::Natural.needs_segmentation());
    }

    #[test]
    fn test_parse_ids() {
        for effect in EffectType::all() {
            assert_eq!(effect.id().parse::<EffectType>(), Ok(*effect));
        }
        assert!("sparkles".parse::<EffectType>().is_err());
    }

    #[test]
    fn test_from_index() {
        assert_eq!(EffectType::from_index(0), Some(EffectType::BodyTrails));
        assert_eq!(EffectType::from_index(2), Some(EffectType::Natural));
        assert_eq!(EffectType::from_index(3), None);
    }

    #[test]
    fn test_on_interval() {
        let ctx = FrameContext {
            frame_count: 30,
            hue: 0.0,
            video: None,
            mask: None,
            placement: Placement::MIRRORED,
        };
        assert!(ctx.on_interval(15));
        assert!(!ctx.on_interval(12));
        assert!(ctx.on_interval(1));
        assert!(ctx.on_interval(0));
    }
}
