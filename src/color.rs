//! Color transform: raw LED color → (hue at full brightness, opacity).
//!
//! A dim LED and a bright LED of the same hue should look like the same
//! color in the schematic, only fainter. So brightness is moved out of the
//! RGB value and into the element's opacity:
//!
//! 1. `sum = r + g + b`, `opacity = min(sum / 510, 1)`. 510 is the sum of two
//!    saturated channels and counts as full brightness.
//! 2. Off (`sum == 0`) maps to black at opacity 0.
//! 3. Otherwise every channel is scaled by `255 / max(r, g, b)` and rounded,
//!    so the brightest channel always ends up at 255.
//!
//! ## Rust concepts
//! - Pure functions on `Copy` types (no allocation, no side effects)
//! - `f64::round` (half away from zero, same as half-up for positives)

use crate::{Color, SegmentColor};
use std::fmt;

/// Channel sum treated as full brightness.
pub const FULL_BRIGHTNESS_SUM: f64 = 510.0;

/// Style applied to one segment element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayStyle {
    /// Hue at full brightness.
    pub color: Color,
    /// Brightness, in `0.0..=1.0`.
    pub opacity: f64,
}

impl DisplayStyle {
    pub const OFF: Self = Self {
        color: Color::BLACK,
        opacity: 0.0,
    };

    pub fn from_segment_color(color: SegmentColor) -> Self {
        Self::from_rgb(color.rgb())
    }

    pub fn from_rgb(rgb: Color) -> Self {
        let sum = rgb.channel_sum();
        if sum == 0 {
            return Self::OFF;
        }

        let opacity = (sum as f64 / FULL_BRIGHTNESS_SUM).min(1.0);
        let scale = 255.0 / rgb.max_channel() as f64;
        let normalize = |channel: u8| (channel as f64 * scale).round().min(255.0) as u8;

        Self {
            color: Color::new(normalize(rgb.r), normalize(rgb.g), normalize(rgb.b)),
            opacity,
        }
    }

    /// CSS value for the `fill` property.
    pub fn fill(&self) -> String {
        self.color.to_string()
    }

    /// CSS value for the `opacity` property.
    pub fn opacity_value(&self) -> String {
        self.opacity.to_string()
    }

    /// The `(property, value)` pairs this style sets, in emission order.
    pub fn declarations(&self) -> [(&'static str, String); 2] {
        [("fill", self.fill()), ("opacity", self.opacity_value())]
    }
}

impl fmt::Display for DisplayStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fill: {}; opacity: {}", self.color, self.opacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn transform(hex: &str) -> DisplayStyle {
        DisplayStyle::from_segment_color(hex.parse().unwrap())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    // ── Scenarios ──────────────────────────────────────────────────

    #[rstest]
    #[case("FFFFFF", Color::new(255, 255, 255), 1.0)]
    #[case("808080", Color::new(255, 255, 255), 0.7529)]
    #[case("FF0000", Color::new(255, 0, 0), 0.5)]
    #[case("010203", Color::new(85, 170, 255), 0.01176)]
    #[case("000000", Color::new(0, 0, 0), 0.0)]
    #[case("00ff00", Color::new(0, 255, 0), 0.5)]
    #[case("ffff00", Color::new(255, 255, 0), 1.0)]
    #[case("400020", Color::new(255, 0, 128), 0.18824)]
    fn transform_scenarios(#[case] hex: &str, #[case] color: Color, #[case] opacity: f64) {
        let style = transform(hex);
        assert_eq!(style.color, color);
        assert_close(style.opacity, opacity);
    }

    #[test]
    fn off_is_black_and_transparent() {
        assert_eq!(transform("000000"), DisplayStyle::OFF);
    }

    #[test]
    fn half_opacity_renders_exactly() {
        assert_eq!(transform("ff0000").to_string(), "fill: rgb(255,0,0); opacity: 0.5");
    }

    #[test]
    fn full_opacity_renders_as_one() {
        assert_eq!(transform("ffffff").opacity_value(), "1");
    }

    // ── Laws ───────────────────────────────────────────────────────

    /// A spread of inputs: all channels on a coarse grid.
    fn sample_colors() -> Vec<Color> {
        let steps = [0u8, 1, 2, 3, 17, 64, 127, 128, 200, 254, 255];
        let mut colors = Vec::new();
        for &r in &steps {
            for &g in &steps {
                for &b in &steps {
                    colors.push(Color::new(r, g, b));
                }
            }
        }
        colors
    }

    #[test]
    fn hue_is_preserved_at_full_saturation() {
        for rgb in sample_colors().into_iter().filter(|c| c.channel_sum() > 0) {
            let style = DisplayStyle::from_rgb(rgb);
            assert_eq!(style.color.max_channel(), 255, "input {rgb:?}");

            let scale = 255.0 / rgb.max_channel() as f64;
            for (input, output) in [
                (rgb.r, style.color.r),
                (rgb.g, style.color.g),
                (rgb.b, style.color.b),
            ] {
                assert!(
                    (input as f64 * scale - output as f64).abs() <= 0.5,
                    "input {rgb:?} produced {:?}",
                    style.color
                );
            }
        }
    }

    #[test]
    fn opacity_is_capped_and_monotonic_in_channel_sum() {
        let mut styles: Vec<(u16, f64)> = sample_colors()
            .into_iter()
            .map(|c| (c.channel_sum(), DisplayStyle::from_rgb(c).opacity))
            .collect();
        styles.sort_by_key(|(sum, _)| *sum);

        for (_, opacity) in &styles {
            assert!((0.0..=1.0).contains(opacity));
        }
        for pair in styles.windows(2) {
            assert!(pair[0].1 <= pair[1].1, "{:?} then {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn declarations_are_fill_then_opacity() {
        let [fill, opacity] = transform("010203").declarations();
        assert_eq!(fill, ("fill", "rgb(85,170,255)".to_string()));
        assert_eq!(opacity.0, "opacity");
    }
}
