//! Color model: categorical jurisdiction palette and continuous risk gradients.

use serde::{Deserialize, Serialize};

/// Linear RGB color with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from 8-bit sRGB-style components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Component-wise linear interpolation; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Multiplies every channel by `k`.
    pub fn scaled(self, k: f32) -> Rgb {
        Rgb::new(self.r * k, self.g * k, self.b * k)
    }

    /// Largest absolute channel difference.
    pub fn distance(self, other: Rgb) -> f32 {
        (self.r - other.r)
            .abs()
            .max((self.g - other.g).abs())
            .max((self.b - other.b).abs())
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Quantizes to RGBA8 for renderers that take byte colors.
    pub fn to_rgba8(self, alpha: f32) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(alpha)]
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(c: [f32; 3]) -> Self {
        Rgb::new(c[0], c[1], c[2])
    }
}

/// Categorical colors, one per jurisdiction lane.
pub const JURISDICTION_PALETTE: [Rgb; 8] = [
    Rgb::new(0.30, 0.55, 0.95), // blue
    Rgb::new(0.25, 0.80, 0.75), // teal
    Rgb::new(0.55, 0.85, 0.35), // green
    Rgb::new(0.95, 0.80, 0.30), // yellow
    Rgb::new(0.70, 0.45, 0.95), // violet
    Rgb::new(0.95, 0.55, 0.75), // pink
    Rgb::new(0.60, 0.65, 0.70), // slate
    Rgb::new(0.95, 0.60, 0.30), // orange
];

/// Palette lookup, wrapped modulo the palette size.
pub fn jurisdiction_color(bucket: u8) -> Rgb {
    JURISDICTION_PALETTE[bucket as usize % JURISDICTION_PALETTE.len()]
}

/// Piecewise-linear gradient over three stops at risk 0.0, 0.5 and 1.0.
///
/// Adjacent segments share their endpoint color, so the gradient is
/// continuous everywhere including at the stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskGradient {
    pub low: Rgb,
    pub medium: Rgb,
    pub high: Rgb,
}

impl Default for RiskGradient {
    fn default() -> Self {
        Self {
            low: Rgb::new(0.20, 0.75, 0.55),
            medium: Rgb::new(1.00, 0.70, 0.15),
            high: Rgb::new(1.00, 0.18, 0.18),
        }
    }
}

impl RiskGradient {
    /// Samples the gradient; out-of-range and NaN inputs are clamped.
    pub fn sample(&self, risk: f32) -> Rgb {
        let r = if risk.is_nan() { 0.0 } else { risk.clamp(0.0, 1.0) };
        if r <= 0.5 {
            self.low.lerp(self.medium, r / 0.5)
        } else {
            self.medium.lerp(self.high, (r - 0.5) / 0.5)
        }
    }
}
