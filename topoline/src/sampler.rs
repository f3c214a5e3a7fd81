//! Elevation sampling over bounding boxes.
//!
//! A [`Sampler`] walks a region through a [`TileCache`] and produces
//! [`GeoPoint`]s (grid and step modes) or a dense [`ElevationGrid`].
//!
//! # Failure handling
//!
//! Malformed boxes and latitudes outside the Mercator range are rejected
//! before any tile is requested. Once sampling starts, a tile that fails to
//! load is logged and skipped so the rest of the region is still covered.

use std::collections::HashSet;

use serde::Serialize;

use crate::addressing::{lon_lat_to_tile, tile_to_lon_lat, tiles_covering, TileKey, DEFAULT_TILE_SIZE};
use crate::cache::TileCache;
use crate::error::{Result, TopoError};
use crate::fetch::TileFetcher;
use crate::geo::{BoundingBox, GeoPoint, HeightRange};
use crate::grid::ElevationGrid;

/// Degrees of latitude per meter on the ground.
pub const DEGREES_PER_METER: f64 = 1.0 / 111_000.0;

/// Default zoom level for sampling.
pub const DEFAULT_ZOOM: u8 = 14;

/// Default ground spacing between step samples, in meters.
pub const DEFAULT_SPACING_M: f64 = 5.0;

/// Finest ground spacing accepted for step sampling and strips, in meters.
pub const MIN_SPACING_M: f64 = 0.1;

/// Largest number of positions a single step-mode run may visit.
pub const MAX_STEP_SAMPLES: u64 = 1 << 24;

/// Settings shared by every sampling mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingConfig {
    /// Zoom level tiles are requested at.
    pub zoom: u8,
    /// Tile resolution in pixels.
    pub tile_size: u32,
    /// Plausible elevation window; samples outside it are dropped.
    pub valid_range: HeightRange,
    /// Ground spacing of step mode, in meters.
    pub spacing_m: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            tile_size: DEFAULT_TILE_SIZE,
            valid_range: HeightRange::default(),
            spacing_m: DEFAULT_SPACING_M,
        }
    }
}

impl SamplingConfig {
    /// Step size in degrees derived from `spacing_m`.
    pub fn step_degrees(&self) -> f64 {
        self.spacing_m * DEGREES_PER_METER
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(TopoError::InvalidConfig {
                reason: "tile size must be positive".to_string(),
            });
        }
        if !(self.spacing_m >= MIN_SPACING_M) || !self.spacing_m.is_finite() {
            return Err(TopoError::InvalidConfig {
                reason: format!(
                    "sample spacing must be at least {} m, got {}",
                    MIN_SPACING_M, self.spacing_m
                ),
            });
        }
        if !(self.valid_range.min < self.valid_range.max) {
            return Err(TopoError::InvalidConfig {
                reason: format!(
                    "valid range {}..{} is empty",
                    self.valid_range.min, self.valid_range.max
                ),
            });
        }
        Ok(())
    }
}

/// Counters describing one sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleStats {
    /// Tiles that were loaded and read.
    pub tiles_used: u64,
    /// Tiles that failed to load and were skipped.
    pub tiles_failed: u64,
    /// Samples dropped for no data or an implausible elevation.
    pub samples_rejected: u64,
}

/// Points produced by a sampling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Samples {
    pub points: Vec<GeoPoint>,
    pub stats: SampleStats,
}

/// Elevation sampler bound to a tile cache.
pub struct Sampler<'a, F> {
    cache: &'a TileCache<F>,
    config: SamplingConfig,
}

impl<'a, F: TileFetcher> Sampler<'a, F> {
    pub fn new(cache: &'a TileCache<F>, config: SamplingConfig) -> Self {
        Self { cache, config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Elevation at a single coordinate.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(elevation))` - decoded elevation in meters
    /// - `Ok(None)` - the pixel carries the no-data sentinel
    /// - `Err(...)` - invalid coordinates, or the tile could not be loaded
    pub async fn elevation_at(&self, lon: f64, lat: f64) -> Result<Option<f64>> {
        let pos = lon_lat_to_tile(lon, lat, self.config.zoom, self.config.tile_size)?;
        let tile = self.cache.get(pos.key).await?;
        Ok(tile.elevation_at(pos.pixel_x, pos.pixel_y))
    }

    /// Sample every pixel of every tile intersecting `bbox`.
    ///
    /// Each pixel is reprojected at its center. Samples without data, outside
    /// the plausible range, or outside the box are dropped. Output order
    /// follows the tiles (row-major) and is not meaningful otherwise.
    pub async fn sample_grid(&self, bbox: &BoundingBox) -> Result<Samples> {
        self.config.validate()?;
        let keys = tiles_covering(bbox, self.config.zoom)?;

        let mut samples = Samples::default();
        for key in keys {
            let tile = match self.cache.get(key).await {
                Ok(tile) => tile,
                Err(e) => {
                    tracing::warn!(%key, error = %e, "Skipping tile");
                    samples.stats.tiles_failed += 1;
                    continue;
                }
            };
            samples.stats.tiles_used += 1;

            let size = tile.size();
            for py in 0..size {
                for px in 0..size {
                    let (lon, lat) =
                        tile_to_lon_lat(key, px as f64 + 0.5, py as f64 + 0.5, size);
                    if !bbox.contains(lon, lat) {
                        continue;
                    }
                    match tile.elevation_at(px, py) {
                        Some(h) if self.config.valid_range.contains(h) => {
                            samples.points.push(GeoPoint::new(lon, lat, h));
                        }
                        _ => samples.stats.samples_rejected += 1,
                    }
                }
            }
        }

        tracing::debug!(
            points = samples.points.len(),
            tiles = samples.stats.tiles_used,
            failed = samples.stats.tiles_failed,
            "Grid sampling complete"
        );
        Ok(samples)
    }

    /// Sample `bbox` in fixed angular steps, longitude outer, latitude inner.
    ///
    /// Steps start at the minimum corner and include the maximum edge when a
    /// step lands on it. Positions are computed from the step index, so long
    /// runs do not accumulate rounding drift.
    pub async fn sample_steps(&self, bbox: &BoundingBox) -> Result<Samples> {
        self.config.validate()?;
        // Reject the whole box up front rather than failing halfway through
        tiles_covering(bbox, self.config.zoom)?;

        let step = self.config.step_degrees();
        let count = step_count(bbox.width(), step).saturating_mul(step_count(bbox.height(), step));
        if count > MAX_STEP_SAMPLES {
            return Err(TopoError::InvalidConfig {
                reason: format!(
                    "{} step samples exceed the limit of {}; use a smaller box or a larger spacing",
                    count, MAX_STEP_SAMPLES
                ),
            });
        }

        let lons = steps(bbox.min_lon(), bbox.max_lon(), step);
        let lats = steps(bbox.min_lat(), bbox.max_lat(), step);

        let mut samples = Samples::default();
        let mut used: HashSet<TileKey> = HashSet::new();
        let mut failed: HashSet<TileKey> = HashSet::new();

        for &lon in &lons {
            for &lat in &lats {
                let pos = lon_lat_to_tile(lon, lat, self.config.zoom, self.config.tile_size)?;
                if failed.contains(&pos.key) {
                    samples.stats.samples_rejected += 1;
                    continue;
                }

                let tile = match self.cache.get(pos.key).await {
                    Ok(tile) => tile,
                    Err(e) => {
                        tracing::warn!(key = %pos.key, error = %e, "Skipping tile");
                        failed.insert(pos.key);
                        samples.stats.samples_rejected += 1;
                        continue;
                    }
                };
                used.insert(pos.key);

                match tile.elevation_at(pos.pixel_x, pos.pixel_y) {
                    Some(h) if self.config.valid_range.contains(h) => {
                        samples.points.push(GeoPoint::new(lon, lat, h));
                    }
                    _ => samples.stats.samples_rejected += 1,
                }
            }
        }

        samples.stats.tiles_used = used.len() as u64;
        samples.stats.tiles_failed = failed.len() as u64;

        tracing::debug!(
            points = samples.points.len(),
            step_deg = step,
            rejected = samples.stats.samples_rejected,
            "Step sampling complete"
        );
        Ok(samples)
    }

    /// Mosaic every tile intersecting `bbox` into one grid.
    ///
    /// The grid spans the union of the covering tiles, not just the box.
    /// Tiles that fail to load leave their cells as no data.
    pub async fn sample_raster(&self, bbox: &BoundingBox) -> Result<(ElevationGrid, SampleStats)> {
        self.config.validate()?;
        let keys = tiles_covering(bbox, self.config.zoom)?;

        // tiles_covering is never empty for a valid box
        let (first, last) = match (keys.first(), keys.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(TopoError::InvalidBoundingBox {
                    min_lon: bbox.min_lon(),
                    min_lat: bbox.min_lat(),
                    max_lon: bbox.max_lon(),
                    max_lat: bbox.max_lat(),
                })
            }
        };

        let size = self.config.tile_size as usize;
        let cols = (last.x - first.x + 1) as usize;
        let rows = (last.y - first.y + 1) as usize;
        let bounds = first.bounds().union(&last.bounds());

        let mut grid = ElevationGrid::filled(cols * size, rows * size, bounds, f64::NAN);
        let mut stats = SampleStats::default();

        for key in keys {
            match self.cache.get(key).await {
                Ok(tile) => {
                    let col = (key.x - first.x) as usize * size;
                    let row = (key.y - first.y) as usize * size;
                    grid.blit(col, row, &tile, &self.config.valid_range);
                    stats.tiles_used += 1;
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "Skipping tile");
                    stats.tiles_failed += 1;
                }
            }
        }

        stats.samples_rejected = (grid.width() * grid.height() - grid.data_count()) as u64;
        Ok((grid, stats))
    }
}

/// Upper bound on the number of positions [`steps`] yields over `extent`.
fn step_count(extent: f64, step: f64) -> u64 {
    (extent / step).floor() as u64 + 1
}

/// Positions `min, min + step, ...` up to and including `max`.
fn steps(min: f64, max: f64, step: f64) -> Vec<f64> {
    (0u64..)
        .map(|i| min + i as f64 * step)
        .take_while(|v| *v <= max)
        .collect()
}
