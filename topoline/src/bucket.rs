//! Elevation color banding.
//!
//! Two schemes map a height to a discrete bucket:
//!
//! - [`ColorScheme::Quartile`]: normalize against a local min/max and split
//!   into four equal quartiles
//! - [`ColorScheme::Thresholds`]: fixed elevation cut points, independent of
//!   the local range
//!
//! All comparisons are strict `<` in declared order, so a value sitting on a
//! boundary falls into the higher bucket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TopoError;

/// Default cut points (meters) for the named height bands.
pub const DEFAULT_THRESHOLDS: [f64; 4] = [0.1, 20.0, 40.0, 60.0];

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const GREEN: Color = Color::rgb(0.0, 0.5, 0.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.647, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Build a color from hue, saturation and lightness, all in `[0, 1]`.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        if saturation == 0.0 {
            return Self::rgb(lightness, lightness, lightness).with_alpha(alpha);
        }

        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;

        Self {
            r: hue_to_rgb(p, q, hue + 1.0 / 3.0),
            g: hue_to_rgb(p, q, hue),
            b: hue_to_rgb(p, q, hue - 1.0 / 3.0),
            a: alpha,
        }
    }

    /// Hex form `#rrggbbaa`.
    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            byte(self.r),
            byte(self.g),
            byte(self.b),
            byte(self.a)
        )
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Color on the blue (low) to red (high) ramp for `t` in `[0, 1]`.
pub fn ramp_color(t: f64, alpha: f32) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    Color::from_hsl(0.65 - t as f32 * 0.6, 1.0, 0.5, alpha)
}

/// Quartile bucket (0 to 3) of `height` within `[min, max]`.
///
/// A degenerate range (`max <= min`) puts everything in bucket 0.
///
/// # Examples
///
/// ```
/// use topoline::bucket::quartile_bucket;
///
/// assert_eq!(quartile_bucket(24.0, 0.0, 100.0), 0);
/// assert_eq!(quartile_bucket(25.0, 0.0, 100.0), 1);
/// assert_eq!(quartile_bucket(100.0, 0.0, 100.0), 3);
/// ```
pub fn quartile_bucket(height: f64, min: f64, max: f64) -> usize {
    if !(max > min) {
        return 0;
    }

    let t = ((height - min) / (max - min)).clamp(0.0, 1.0);
    if t < 0.25 {
        0
    } else if t < 0.5 {
        1
    } else if t < 0.75 {
        2
    } else {
        3
    }
}

/// Index of the first cut point `height` lies below, or `cuts.len()`.
pub fn threshold_bucket(height: f64, cuts: &[f64]) -> usize {
    cuts.iter()
        .position(|&cut| height < cut)
        .unwrap_or(cuts.len())
}

/// Named elevation bands of the default threshold scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightBand {
    /// Below 0.1 m
    Sea,
    /// 0.1 m to 20 m
    Low,
    /// 20 m to 40 m
    Mid,
    /// 40 m to 60 m
    High,
    /// 60 m and above
    Peak,
}

impl HeightBand {
    pub const ALL: [HeightBand; 5] = [
        HeightBand::Sea,
        HeightBand::Low,
        HeightBand::Mid,
        HeightBand::High,
        HeightBand::Peak,
    ];

    /// Band for an absolute elevation using [`DEFAULT_THRESHOLDS`].
    pub fn from_height(height: f64) -> Self {
        Self::ALL[threshold_bucket(height, &DEFAULT_THRESHOLDS)]
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            HeightBand::Sea => "sea",
            HeightBand::Low => "low",
            HeightBand::Mid => "mid",
            HeightBand::High => "high",
            HeightBand::Peak => "peak",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            HeightBand::Sea => Color::BLUE,
            HeightBand::Low => Color::GREEN,
            HeightBand::Mid => Color::YELLOW,
            HeightBand::High => Color::ORANGE,
            HeightBand::Peak => Color::RED,
        }
        .with_alpha(0.9)
    }
}

impl fmt::Display for HeightBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How heights are mapped to color buckets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    /// Four buckets relative to the local min/max.
    #[default]
    Quartile,
    /// Fixed cut points in meters, ascending.
    Thresholds(Vec<f64>),
}

impl ColorScheme {
    /// The named-band scheme ([`DEFAULT_THRESHOLDS`]).
    pub fn height_bands() -> Self {
        ColorScheme::Thresholds(DEFAULT_THRESHOLDS.to_vec())
    }

    /// Number of distinct buckets this scheme produces.
    pub fn bucket_count(&self) -> usize {
        match self {
            ColorScheme::Quartile => 4,
            ColorScheme::Thresholds(cuts) => cuts.len() + 1,
        }
    }

    /// Bucket of `height`; `min`/`max` are only used by the quartile scheme.
    pub fn bucket(&self, height: f64, min: f64, max: f64) -> usize {
        match self {
            ColorScheme::Quartile => quartile_bucket(height, min, max),
            ColorScheme::Thresholds(cuts) => threshold_bucket(height, cuts),
        }
    }

    /// Display color of a bucket.
    pub fn color(&self, bucket: usize) -> Color {
        const QUARTILE_COLORS: [Color; 4] = [Color::BLUE, Color::CYAN, Color::YELLOW, Color::RED];

        match self {
            ColorScheme::Quartile => QUARTILE_COLORS[bucket.min(3)].with_alpha(0.9),
            ColorScheme::Thresholds(cuts) if cuts[..] == DEFAULT_THRESHOLDS[..] => {
                HeightBand::ALL[bucket.min(4)].color()
            }
            ColorScheme::Thresholds(cuts) => {
                let t = if cuts.is_empty() {
                    0.0
                } else {
                    bucket as f64 / cuts.len() as f64
                };
                ramp_color(t, 0.9)
            }
        }
    }
}

impl FromStr for ColorScheme {
    type Err = TopoError;

    /// Parse `quartile`, `bands`, or a comma-separated ascending list of cuts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quartile" => return Ok(ColorScheme::Quartile),
            "bands" | "thresholds" => return Ok(ColorScheme::height_bands()),
            _ => {}
        }

        let cuts: Vec<f64> = s
            .split(',')
            .map(|c| c.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| TopoError::InvalidConfig {
                reason: format!("unknown color scheme '{}'", s),
            })?;
        if cuts.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(TopoError::InvalidConfig {
                reason: format!("color thresholds '{}' must be strictly ascending", s),
            });
        }
        Ok(ColorScheme::Thresholds(cuts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quartile_boundaries() {
        assert_eq!(quartile_bucket(0.0, 0.0, 100.0), 0);
        assert_eq!(quartile_bucket(24.0, 0.0, 100.0), 0);
        assert_eq!(quartile_bucket(25.0, 0.0, 100.0), 1);
        assert_eq!(quartile_bucket(49.9, 0.0, 100.0), 1);
        assert_eq!(quartile_bucket(50.0, 0.0, 100.0), 2);
        assert_eq!(quartile_bucket(75.0, 0.0, 100.0), 3);
        assert_eq!(quartile_bucket(100.0, 0.0, 100.0), 3);
    }

    #[test]
    fn test_quartile_clamps() {
        assert_eq!(quartile_bucket(-50.0, 0.0, 100.0), 0);
        assert_eq!(quartile_bucket(500.0, 0.0, 100.0), 3);
        // Flat range
        assert_eq!(quartile_bucket(10.0, 10.0, 10.0), 0);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(HeightBand::from_height(0.0), HeightBand::Sea);
        assert_eq!(HeightBand::from_height(0.1), HeightBand::Low);
        assert_eq!(HeightBand::from_height(19.9), HeightBand::Low);
        assert_eq!(HeightBand::from_height(20.0), HeightBand::Mid);
        assert_eq!(HeightBand::from_height(59.9), HeightBand::High);
        assert_eq!(HeightBand::from_height(60.0), HeightBand::Peak);
        assert_eq!(HeightBand::from_height(8848.0), HeightBand::Peak);
        assert_eq!(HeightBand::Mid.index(), 2);
    }

    #[test]
    fn test_scheme_bucket_counts() {
        assert_eq!(ColorScheme::Quartile.bucket_count(), 4);
        assert_eq!(ColorScheme::height_bands().bucket_count(), 5);
        assert_eq!(ColorScheme::Thresholds(vec![]).bucket_count(), 1);

        // Threshold scheme ignores the local range
        let bands = ColorScheme::height_bands();
        assert_eq!(bands.bucket(30.0, 0.0, 31.0), 2);
        assert_eq!(ColorScheme::Quartile.bucket(30.0, 0.0, 31.0), 3);
    }

    #[test]
    fn test_scheme_colors() {
        assert_eq!(ColorScheme::Quartile.color(0), Color::BLUE.with_alpha(0.9));
        assert_eq!(ColorScheme::Quartile.color(3), Color::RED.with_alpha(0.9));
        assert_eq!(ColorScheme::height_bands().color(4), HeightBand::Peak.color());

        let custom = ColorScheme::Thresholds(vec![100.0, 200.0]);
        assert_ne!(custom.color(0), custom.color(2));
    }

    #[test]
    fn test_hsl() {
        let red = Color::from_hsl(0.0, 1.0, 0.5, 1.0);
        assert!((red.r - 1.0).abs() < 1e-6 && red.g.abs() < 1e-6 && red.b.abs() < 1e-6);

        let gray = Color::from_hsl(0.3, 0.0, 0.25, 0.5);
        assert_eq!(gray, Color::rgb(0.25, 0.25, 0.25).with_alpha(0.5));

        assert_eq!(Color::RED.to_hex(), "#ff0000ff");
        assert_eq!(Color::BLUE.with_alpha(0.0).to_hex(), "#0000ff00");
    }

    #[test]
    fn test_parse_scheme() {
        assert_eq!("quartile".parse::<ColorScheme>().unwrap(), ColorScheme::Quartile);
        assert_eq!(
            "bands".parse::<ColorScheme>().unwrap(),
            ColorScheme::height_bands()
        );
        assert_eq!(
            "10, 50,100".parse::<ColorScheme>().unwrap(),
            ColorScheme::Thresholds(vec![10.0, 50.0, 100.0])
        );
        assert!("50,10".parse::<ColorScheme>().is_err());
        assert!("rainbow".parse::<ColorScheme>().is_err());
    }
}
