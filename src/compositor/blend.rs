//! Blend mode definitions and per-pixel compositing
//!
//! Defines the blend modes used when drawing onto the trail buffer and
//! implements them on non-premultiplied RGBA8 pixels.

use serde::{Deserialize, Serialize};

/// Blend modes for drawing a source image onto a destination surface.
///
/// Each mode is a separable blend function `B(backdrop, source)` combined
/// with source-over alpha compositing, as in the 2D canvas
/// `globalCompositeOperation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Standard alpha blending (Porter-Duff source-over)
    /// Result = Source × SourceAlpha + Dest × (1 - SourceAlpha)
    #[default]
    Normal,

    /// Lighten
    /// Result = max(Source, Dest)
    /// Only brighter pixels show through, so frames stack up
    Lighten,

    /// Screen blending
    /// Result = 1 - (1 - Source) × (1 - Dest)
    Screen,

    /// Multiply blending
    /// Result = Source × Dest
    Multiply,

    /// Additive blending (linear dodge)
    /// Result = min(1, Source + Dest)
    Additive,
}

impl BlendMode {
    /// Separable blend function on normalized channel values
    fn blend_channel(self, backdrop: f32, source: f32) -> f32 {
        match self {
            BlendMode::Normal => source,
            BlendMode::Lighten => backdrop.max(source),
            BlendMode::Screen => backdrop + source - backdrop * source,
            BlendMode::Multiply => backdrop * source,
            BlendMode::Additive => (backdrop + source).min(1.0),
        }
    }

    /// Composite `src` over `dst` with this blend mode
    pub fn blend_pixel(self, src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
        let a_s = src[3] as f32 / 255.0;
        if a_s <= 0.0 {
            return dst;
        }
        let a_b = dst[3] as f32 / 255.0;

        // Fast path: opaque normal draw replaces the destination
        if self == BlendMode::Normal && src[3] == 255 {
            return src;
        }

        let a_o = a_s + a_b * (1.0 - a_s);
        let mut out = [0u8; 4];
        for c in 0..3 {
            let cs = src[c] as f32 / 255.0;
            let cb = dst[c] as f32 / 255.0;
            let mixed = (1.0 - a_b) * cs + a_b * self.blend_channel(cb, cs);
            let co = (a_s * mixed + a_b * cb * (1.0 - a_s)) / a_o;
            out[c] = to_u8(co);
        }
        out[3] = to_u8(a_o);
        out
    }

    /// Get a human-readable name for the blend mode
    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Lighten => "Lighten",
            BlendMode::Screen => "Screen",
            BlendMode::Multiply => "Multiply",
            BlendMode::Additive => "Additive",
        }
    }

    /// Get all available blend modes
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Lighten,
            BlendMode::Screen,
            BlendMode::Multiply,
            BlendMode::Additive,
        ]
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "source-over" => Ok(BlendMode::Normal),
            "lighten" => Ok(BlendMode::Lighten),
            "screen" => Ok(BlendMode::Screen),
            "multiply" => Ok(BlendMode::Multiply),
            "additive" | "lighter" => Ok(BlendMode::Additive),
            other => Err(format!("unknown blend mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_mode_default() {
        assert_eq!(BlendMode::default(), BlendMode::Normal);
    }

    #[test]
    fn test_blend_mode_display() {
        assert_eq!(format!("{}", BlendMode::Normal), "Normal");
        assert_eq!(format!("{}", BlendMode::Lighten), "Lighten");
    }

    #[test]
    fn test_blend_mode_parse() {
        assert_eq!("lighten".parse::<BlendMode>(), Ok(BlendMode::Lighten));
        assert_eq!("source-over".parse::<BlendMode>(), Ok(BlendMode::Normal));
        assert!("dissolve".parse::<BlendMode>().is_err());
    }

    #[test]
    fn test_blend_mode_all() {
        let all = BlendMode::all();
        assert_eq!(all.len(), 5);
        assert!(all.contains(&BlendMode::Lighten));
    }

    #[test]
    fn test_lighten_opaque_is_channel_max() {
        let src = [200, 10, 90, 255];
        let dst = [50, 120, 90, 255];
        assert_eq!(BlendMode::Lighten.blend_pixel(src, dst), [200, 120, 90, 255]);
    }

    #[test]
    fn test_lighten_over_black_is_source() {
        let src = [12, 34, 56, 255];
        assert_eq!(BlendMode::Lighten.blend_pixel(src, [0, 0, 0, 255]), src);
    }

    #[test]
    fn test_transparent_source_keeps_destination() {
        let dst = [1, 2, 3, 255];
        for mode in BlendMode::all() {
            assert_eq!(mode.blend_pixel([255, 255, 255, 0], dst), dst);
        }
    }

    #[test]
    fn test_normal_half_alpha() {
        let out = BlendMode::Normal.blend_pixel([255, 0, 0, 128], [0, 0, 255, 255]);
        assert_eq!(out[3], 255);
        assert!((out[0] as i32 - 128).abs() <= 1);
        assert!((out[2] as i32 - 127).abs() <= 1);
    }

    #[test]
    fn test_source_over_transparent_destination() {
        // Backdrop alpha 0 means the blend function has no effect
        let src = [100, 150, 200, 255];
        assert_eq!(BlendMode::Multiply.blend_pixel(src, [0, 0, 0, 0]), src);
    }

    #[test]
    fn test_screen_and_multiply() {
        let src = [255, 0, 128, 255];
        let dst = [128, 128, 128, 255];
        assert_eq!(BlendMode::Screen.blend_pixel(src, dst), [255, 128, 192, 255]);
        assert_eq!(BlendMode::Multiply.blend_pixel(src, dst), [128, 0, 64, 255]);
        assert_eq!(BlendMode::Additive.blend_pixel(src, dst), [255, 128, 255, 255]);
    }
}
