//! HSB colors and image tints

/// Convert HSB to RGB.
///
/// `hue` is in degrees (wrapped into 0..360), `saturation` and `brightness`
/// are on a 0..100 scale.
pub fn hsb_to_rgb(hue: f32, saturation: f32, brightness: f32) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let v = (brightness / 100.0).clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

/// Multiplicative image tint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tint {
    pub rgba: [u8; 4],
}

impl Tint {
    /// Tint from HSB components with alpha on a 0..100 scale.
    ///
    /// Alpha above 100 clamps to fully opaque.
    pub fn from_hsb(hue: f32, saturation: f32, brightness: f32, alpha: f32) -> Self {
        let [r, g, b] = hsb_to_rgb(hue, saturation, brightness);
        let a = ((alpha / 100.0).clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { rgba: [r, g, b, a] }
    }

    /// Multiply each channel of `px` by the tint
    pub fn apply(&self, px: [u8; 4]) -> [u8; 4] {
        let mut out = [0u8; 4];
        for c in 0..4 {
            out[c] = ((px[c] as u16 * self.rgba[c] as u16 + 127) / 255) as u8;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_hues() {
        assert_eq!(hsb_to_rgb(0.0, 100.0, 100.0), [255, 0, 0]);
        assert_eq!(hsb_to_rgb(120.0, 100.0, 100.0), [0, 255, 0]);
        assert_eq!(hsb_to_rgb(240.0, 100.0, 100.0), [0, 0, 255]);
        assert_eq!(hsb_to_rgb(360.0, 100.0, 100.0), [255, 0, 0]);
    }

    #[test]
    fn test_zero_saturation_is_gray() {
        assert_eq!(hsb_to_rgb(200.0, 0.0, 50.0), [128, 128, 128]);
        assert_eq!(hsb_to_rgb(10.0, 70.0, 0.0), [0, 0, 0]);
    }

    #[test]
    fn test_color_trip_tint() {
        // Hue 0 at 70% saturation, full brightness
        let tint = Tint::from_hsb(0.0, 70.0, 100.0, 255.0);
        assert_eq!(tint.rgba, [255, 77, 77, 255]);
    }

    #[test]
    fn test_tint_apply() {
        let white = Tint { rgba: [255; 4] };
        assert_eq!(white.apply([10, 20, 30, 40]), [10, 20, 30, 40]);

        let half_red = Tint { rgba: [255, 0, 0, 255] };
        assert_eq!(half_red.apply([200, 200, 200, 255]), [200, 0, 0, 255]);
    }
}
