//! Vectorization of sampled elevation into contour rings and banded strips.
//!
//! Two strategies share this module:
//!
//! - **Ring**: threshold-band approximation of iso-contours over a dense
//!   [`ElevationGrid`]. Every cell within half an interval of a level joins
//!   that level's ring, in scan order. This is not a marching-squares trace.
//! - **Stripe**: points are grouped into north-south strips by longitude,
//!   filtered, smoothed and split into color buckets per segment.
//!
//! Levels and strips without enough data are skipped and counted, never
//! reported as errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bucket::ColorScheme;
use crate::error::{Result, TopoError};
use crate::geo::{GeoPoint, HeightRange, Position};
use crate::grid::ElevationGrid;
use crate::sampler::{DEFAULT_SPACING_M, DEGREES_PER_METER, MIN_SPACING_M};
use crate::smooth::smooth;

/// Default height difference between contour levels, in meters.
pub const DEFAULT_CONTOUR_INTERVAL: f64 = 10.0;

/// Default row/column stride when scanning a grid for contour cells.
pub const DEFAULT_CONTOUR_STRIDE: usize = 2;

/// Fewest points a contour level needs to be kept.
pub const MIN_RING_POINTS: usize = 7;

/// Vectorization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Closed rings per elevation level.
    Ring,
    /// Color-banded north-south strips.
    #[default]
    Stripe,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Ring => write!(f, "ring"),
            Strategy::Stripe => write!(f, "stripe"),
        }
    }
}

impl FromStr for Strategy {
    type Err = TopoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ring" | "rings" | "contour" => Ok(Strategy::Ring),
            "stripe" | "stripes" | "strip" => Ok(Strategy::Stripe),
            other => Err(TopoError::InvalidConfig {
                reason: format!("unknown strategy '{}' (expected ring or stripe)", other),
            }),
        }
    }
}

/// One contour level: the matching points joined into a closed ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    /// Elevation of this level in meters.
    pub level: f64,
    /// Ring points at the level height; the last point repeats the first.
    pub ring: Vec<GeoPoint>,
}

/// Settings for [`build_rings`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingConfig {
    /// Height difference between levels in meters.
    pub interval: f64,
    /// Scan every `stride`-th row and column.
    pub stride: usize,
    /// Fewest matching points for a level to be kept.
    pub min_points: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CONTOUR_INTERVAL,
            stride: DEFAULT_CONTOUR_STRIDE,
            min_points: MIN_RING_POINTS,
        }
    }
}

impl RingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.interval > 0.0) || !self.interval.is_finite() {
            return Err(TopoError::InvalidConfig {
                reason: format!("contour interval must be positive, got {}", self.interval),
            });
        }
        if self.stride == 0 {
            return Err(TopoError::InvalidConfig {
                reason: "contour stride must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Build contour rings for levels `0, interval, 2·interval, …` up to the
/// grid's highest elevation.
///
/// A cell belongs to a level when its elevation is strictly within
/// `interval / 2` of it, so each cell joins at most one level. Levels are
/// returned in ascending order.
///
/// # Errors
///
/// Returns [`TopoError::InvalidConfig`] for a non-positive interval or a
/// zero stride.
pub fn build_rings(grid: &ElevationGrid, config: &RingConfig) -> Result<Vec<Contour>> {
    config.validate()?;

    let Some(max) = grid.max_elevation() else {
        return Ok(Vec::new());
    };

    let half = config.interval / 2.0;
    let mut levels: BTreeMap<u64, Vec<GeoPoint>> = BTreeMap::new();

    for row in (0..grid.height()).step_by(config.stride) {
        for col in (0..grid.width()).step_by(config.stride) {
            let v = grid.get(col, row);
            if v.is_nan() {
                continue;
            }

            // The only level that can lie within half an interval of v
            let k = (v / config.interval).round();
            if k < 0.0 {
                continue;
            }
            let level = k * config.interval;
            if level > max || (v - level).abs() >= half {
                continue;
            }

            let (lon, lat) = grid.cell_position(col, row);
            levels
                .entry(k as u64)
                .or_default()
                .push(GeoPoint::new(lon, lat, level));
        }
    }

    let mut contours = Vec::new();
    for (k, mut ring) in levels {
        if ring.len() < config.min_points {
            continue;
        }
        ring.push(ring[0]);
        contours.push(Contour {
            level: k as f64 * config.interval,
            ring,
        });
    }

    tracing::debug!(levels = contours.len(), max_elevation = max, "Contour rings built");
    Ok(contours)
}

/// Settings for [`build_strips`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripeConfig {
    /// Strip width in meters on the ground.
    pub spacing_m: f64,
    /// Plausible elevations; others count as invalid.
    pub valid_range: HeightRange,
    /// Strips with fewer points are skipped.
    pub min_points: usize,
    /// Fraction of points that must be valid to keep a strip.
    pub min_valid_ratio: f64,
    /// Moving-average radius applied along each strip.
    pub smoothing_window: usize,
    /// Minimum height difference after smoothing, in meters.
    pub min_relief: f64,
    /// Bucketing of segment heights into colors.
    pub scheme: ColorScheme,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            spacing_m: DEFAULT_SPACING_M,
            valid_range: HeightRange::default(),
            min_points: 3,
            min_valid_ratio: 0.7,
            smoothing_window: 4,
            min_relief: 2.0,
            scheme: ColorScheme::Quartile,
        }
    }
}

impl StripeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.spacing_m >= MIN_SPACING_M) || !self.spacing_m.is_finite() {
            return Err(TopoError::InvalidConfig {
                reason: format!(
                    "strip spacing must be at least {} m, got {}",
                    MIN_SPACING_M, self.spacing_m
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_valid_ratio) {
            return Err(TopoError::InvalidConfig {
                reason: format!(
                    "minimum valid ratio must be within 0..1, got {}",
                    self.min_valid_ratio
                ),
            });
        }
        Ok(())
    }
}

/// A strip after filtering and smoothing, with segment endpoints sorted
/// into color buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandedStrip {
    /// Strip index, `round(lon / step)`.
    pub strip: i64,
    pub min_height: f64,
    pub max_height: f64,
    /// Endpoint pairs per bucket, indexed by bucket.
    pub bands: Vec<Vec<Position>>,
}

/// What happened to the strips of one [`build_strips`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripStats {
    pub total: usize,
    pub too_few_points: usize,
    pub mostly_invalid: usize,
    pub too_flat: usize,
    pub emitted: usize,
}

/// Group points into strips and split each strip into color buckets.
///
/// Strips come out in ascending longitude order. Every consecutive pair of
/// smoothed points contributes both endpoints to the bucket of the pair's
/// mean height.
pub fn build_strips(points: &[GeoPoint], config: &StripeConfig) -> (Vec<BandedStrip>, StripStats) {
    let step = config.spacing_m * DEGREES_PER_METER;
    let mut groups: BTreeMap<i64, Vec<GeoPoint>> = BTreeMap::new();
    for p in points {
        groups.entry((p.lon / step).round() as i64).or_default().push(*p);
    }

    let mut stats = StripStats {
        total: groups.len(),
        ..Default::default()
    };
    let mut strips = Vec::new();

    for (strip, group) in groups {
        if group.len() < config.min_points {
            stats.too_few_points += 1;
            continue;
        }

        let mut valid: Vec<GeoPoint> = group
            .iter()
            .copied()
            .filter(|p| config.valid_range.contains(p.height))
            .collect();
        if (valid.len() as f64) / (group.len() as f64) < config.min_valid_ratio {
            stats.mostly_invalid += 1;
            continue;
        }

        valid.sort_by(|a, b| a.lat.total_cmp(&b.lat));
        let smoothed = smooth(&valid, config.smoothing_window);

        let min = smoothed.iter().map(|p| p.height).fold(f64::INFINITY, f64::min);
        let max = smoothed
            .iter()
            .map(|p| p.height)
            .fold(f64::NEG_INFINITY, f64::max);
        if !(max - min >= config.min_relief) {
            stats.too_flat += 1;
            continue;
        }

        let mut bands = vec![Vec::new(); config.scheme.bucket_count()];
        for pair in smoothed.windows(2) {
            let mean = (pair[0].height + pair[1].height) / 2.0;
            let bucket = config.scheme.bucket(mean, min, max);
            bands[bucket].push(Position::from(pair[0]));
            bands[bucket].push(Position::from(pair[1]));
        }

        stats.emitted += 1;
        strips.push(BandedStrip {
            strip,
            min_height: min,
            max_height: max,
            bands,
        });
    }

    tracing::debug!(
        total = stats.total,
        emitted = stats.emitted,
        too_flat = stats.too_flat,
        mostly_invalid = stats.mostly_invalid,
        "Strips built"
    );
    (strips, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::BoundingBox;

    const LON: f64 = 103.8;

    fn strip(heights: &[f64]) -> Vec<GeoPoint> {
        heights
            .iter()
            .enumerate()
            .map(|(i, &h)| GeoPoint::new(LON, -3.81 + i as f64 * 0.00005, h))
            .collect()
    }

    /// Twenty points: `nan_count` without data, the rest split evenly
    /// between `low` and `high`.
    fn step_profile(nan_count: usize, low: f64, high: f64) -> Vec<f64> {
        let valid = 20 - nan_count;
        let mut heights: Vec<f64> = (0..valid)
            .map(|i| if i < valid / 2 { low } else { high })
            .collect();
        heights.extend(std::iter::repeat(f64::NAN).take(nan_count));
        heights
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("ring".parse::<Strategy>().unwrap(), Strategy::Ring);
        assert_eq!("Stripe".parse::<Strategy>().unwrap(), Strategy::Stripe);
        assert!("marching".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Ring.to_string(), "ring");
    }

    #[test]
    fn test_stripe_spacing_has_a_floor() {
        assert!(StripeConfig::default().validate().is_ok());
        let config = StripeConfig {
            spacing_m: 1e-9,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TopoError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_mostly_invalid_strip_is_discarded() {
        // 12 of 20 valid is 60%
        let points = strip(&step_profile(8, 100.0, 110.0));
        let (strips, stats) = build_strips(&points, &StripeConfig::default());

        assert!(strips.is_empty());
        assert_eq!(stats.total, 1);
        assert_eq!(stats.mostly_invalid, 1);
    }

    #[test]
    fn test_flat_strip_is_discarded() {
        let points = strip(&step_profile(2, 100.0, 101.5));
        let (strips, stats) = build_strips(&points, &StripeConfig::default());

        assert!(strips.is_empty());
        assert_eq!(stats.too_flat, 1);
    }

    #[test]
    fn test_strip_emits_bands() {
        let points = strip(&step_profile(2, 100.0, 102.5));
        let (strips, stats) = build_strips(&points, &StripeConfig::default());

        assert_eq!(stats.emitted, 1);
        assert_eq!(strips.len(), 1);

        let strip = &strips[0];
        assert!(strip.max_height - strip.min_height >= 2.0);
        assert_eq!(strip.bands.len(), 4);

        // 18 valid points make 17 pairs, two endpoints each
        let total: usize = strip.bands.iter().map(Vec::len).sum();
        assert_eq!(total, 34);
        assert!(!strip.bands[0].is_empty());
        assert!(!strip.bands[3].is_empty());

        // Endpoints carry smoothed heights, ordered south to north
        let lowest = &strip.bands[0];
        assert!(lowest.windows(2).all(|w| w[0].lat <= w[1].lat));
        assert!(lowest.iter().all(|p| p.height < 101.25));
    }

    #[test]
    fn test_too_few_points() {
        let points = strip(&[10.0, 50.0]);
        let (strips, stats) = build_strips(&points, &StripeConfig::default());
        assert!(strips.is_empty());
        assert_eq!(stats.too_few_points, 1);
    }

    #[test]
    fn test_strips_grouped_by_longitude() {
        let step = DEFAULT_SPACING_M * DEGREES_PER_METER;
        let mut points = Vec::new();
        for s in [3, 1, 2] {
            for (i, h) in [0.0, 10.0, 20.0, 30.0].iter().enumerate() {
                // Small jitter still rounds into the same strip
                let lon = s as f64 * step + 0.1 * step;
                points.push(GeoPoint::new(lon, i as f64 * 0.0001, *h));
            }
        }

        let config = StripeConfig {
            smoothing_window: 0,
            ..Default::default()
        };
        let (strips, stats) = build_strips(&points, &config);
        assert_eq!(stats.total, 3);
        let keys: Vec<i64> = strips.iter().map(|s| s.strip).collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn test_threshold_scheme_buckets() {
        let points = strip(&[5.0, 5.0, 5.0, 5.0, 5.0, 80.0, 80.0, 80.0, 80.0, 80.0]);
        let config = StripeConfig {
            smoothing_window: 0,
            scheme: ColorScheme::height_bands(),
            ..Default::default()
        };

        let (strips, _) = build_strips(&points, &config);
        let bands = &strips[0].bands;
        assert_eq!(bands.len(), 5);
        // 5 m pairs are "Low", 80 m pairs "Peak", the 42.5 m mean "High"
        assert_eq!(bands[1].len(), 8);
        assert_eq!(bands[3].len(), 2);
        assert_eq!(bands[4].len(), 8);
    }

    fn grid_with_cells(cells: usize) -> ElevationGrid {
        let bounds = BoundingBox::new(103.80, -3.81, 103.85, -3.76).unwrap();
        let mut grid = ElevationGrid::filled(10, 10, bounds, -500.0);
        for i in 0..cells {
            grid.set(i, 4, 100.0);
        }
        grid
    }

    #[test]
    fn test_ring_needs_seven_points() {
        let config = RingConfig {
            interval: 100.0,
            stride: 1,
            ..Default::default()
        };

        let contours = build_rings(&grid_with_cells(7), &config).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].level, 100.0);
        assert_eq!(contours[0].ring.len(), 8);
        assert_eq!(contours[0].ring[0], contours[0].ring[7]);
        assert!(contours[0].ring.iter().all(|p| p.height == 100.0));

        assert!(build_rings(&grid_with_cells(6), &config).unwrap().is_empty());
    }

    #[test]
    fn test_ring_levels_ascending_and_bounded_by_max() {
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        // Rows of 10 m, 20 m, ... 95 m
        let values: Vec<f64> = (0..100)
            .map(|i| ((i / 10 + 1) * 10) as f64 - if i >= 90 { 5.0 } else { 0.0 })
            .collect();
        let grid = ElevationGrid::new(10, 10, values, bounds).unwrap();
        let config = RingConfig {
            interval: 10.0,
            stride: 1,
            ..Default::default()
        };

        let contours = build_rings(&grid, &config).unwrap();
        let levels: Vec<f64> = contours.iter().map(|c| c.level).collect();
        // 95 m sits exactly between 90 and 100 and matches neither
        assert_eq!(
            levels,
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0]
        );
    }

    #[test]
    fn test_ring_stride_and_invalid_config() {
        let config = RingConfig {
            interval: 100.0,
            stride: 2,
            ..Default::default()
        };
        let bounds = BoundingBox::new(0.0, 0.0, 2.0, 1.0).unwrap();
        let mut grid = ElevationGrid::filled(20, 10, bounds, f64::NAN);
        for col in 0..14 {
            grid.set(col, 4, 100.0);
        }
        grid.set(0, 0, 100.0);
        // Odd rows and columns are skipped: 7 cells on row 4 plus one on row 0
        grid.set(3, 3, 100.0);
        let contours = build_rings(&grid, &config).unwrap();
        assert_eq!(contours[0].ring.len(), 8 + 1);

        let zero = RingConfig {
            interval: 0.0,
            ..Default::default()
        };
        assert!(build_rings(&grid, &zero).is_err());
        let no_stride = RingConfig {
            stride: 0,
            ..Default::default()
        };
        assert!(build_rings(&grid, &no_stride).is_err());
    }
}
