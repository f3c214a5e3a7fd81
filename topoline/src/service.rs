//! Session context tying the pipeline together.
//!
//! [`TopoService`] owns one [`TileCache`] and one [`TopoConfig`]. Every
//! operation goes through it, so independent sessions never share state.
//!
//! ```ignore
//! use topoline::{BoundingBox, Strategy, TopoServiceBuilder};
//!
//! let service = TopoServiceBuilder::new()
//!     .tile_dir("/data/terrain-rgb")
//!     .zoom(14)
//!     .cache_size(256)
//!     .build()?;
//!
//! let bbox = BoundingBox::new(103.80, -3.81, 103.85, -3.76)?;
//! let output = service.contours(&bbox, Strategy::Stripe).await?;
//! println!("{} batches in {}ms", output.batches.len(), output.elapsed_ms);
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::addressing::{lon_lat_to_tile, tiles_covering, TilePosition};
use crate::bucket::ColorScheme;
use crate::cache::{CacheStats, TileCache, DEFAULT_CACHE_SIZE};
use crate::contour::{build_rings, build_strips, RingConfig, StripStats, StripeConfig, Strategy};
use crate::emit::{emit_all, ring_batches, strip_batches, Renderer, SegmentBatch, DEFAULT_LAYER_OFFSET};
use crate::error::{Result, TopoError};
use crate::fetch::{
    LocalFetcher, TileFetcher, TileSource, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};
use crate::geo::{BoundingBox, HeightRange};
use crate::sampler::{SampleStats, Sampler, Samples, SamplingConfig};

#[cfg(feature = "http")]
use crate::fetch::{FetchConfig, HttpFetcher};

/// All pipeline settings of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopoConfig {
    pub sampling: SamplingConfig,
    pub stripe: StripeConfig,
    pub ring: RingConfig,
    /// Vertical separation between stacked contour rings, in meters.
    pub layer_offset: f64,
    /// Maximum number of tiles kept in memory.
    pub cache_size: u64,
}

impl Default for TopoConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            stripe: StripeConfig::default(),
            ring: RingConfig::default(),
            layer_offset: DEFAULT_LAYER_OFFSET,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl TopoConfig {
    /// Check every stage's settings.
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        self.stripe.validate()?;
        self.ring.validate()?;
        if self.cache_size == 0 {
            return Err(TopoError::InvalidConfig {
                reason: "cache size must be at least 1 tile".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of one contour run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourOutput {
    pub strategy: Strategy,
    pub batches: Vec<SegmentBatch>,
    /// Points (stripe) or grid cells with data (ring) fed to the builder.
    pub points_sampled: usize,
    pub sample_stats: SampleStats,
    /// Strip outcomes, stripe strategy only.
    pub strip_stats: Option<StripStats>,
    /// Contour levels kept, ring strategy only.
    pub contour_count: usize,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// Statistics from a preload operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadStats {
    /// Number of tiles successfully loaded into cache.
    pub tiles_loaded: u64,
    /// Number of tiles that were already in cache.
    pub tiles_already_cached: u64,
    /// Number of tiles that failed to load.
    pub tiles_failed: u64,
    /// Number of tiles covering the bounding box.
    pub tiles_matched: u64,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// Terrain sampling and vectorization session.
///
/// # Example
///
/// ```ignore
/// use topoline::{TopoService, TopoConfig};
/// use topoline::fetch::LocalFetcher;
///
/// let service = TopoService::new(LocalFetcher::new("/data/terrain-rgb"), TopoConfig::default())?;
///
/// // Query elevation - tile is fetched automatically
/// let elevation = service.elevation(103.825, -3.785).await?;
///
/// // Check cache statistics
/// let stats = service.cache_stats();
/// println!("Cache hit rate: {:.1}%", stats.hit_rate() * 100.0);
/// ```
pub struct TopoService<F> {
    cache: TileCache<F>,
    config: TopoConfig,
}

impl<F: TileFetcher> TopoService<F> {
    /// Create a session around `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`TopoError::InvalidConfig`] if any setting is unusable.
    pub fn new(fetcher: F, config: TopoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: TileCache::new(fetcher, config.cache_size),
            config,
        })
    }

    pub fn config(&self) -> &TopoConfig {
        &self.config
    }

    /// Returns the tile cache.
    pub fn cache(&self) -> &TileCache<F> {
        &self.cache
    }

    fn sampler(&self) -> Sampler<'_, F> {
        Sampler::new(&self.cache, self.config.sampling.clone())
    }

    /// Tile and pixel a coordinate falls on at the session's zoom.
    pub fn tile_position(&self, lon: f64, lat: f64) -> Result<TilePosition> {
        lon_lat_to_tile(
            lon,
            lat,
            self.config.sampling.zoom,
            self.config.sampling.tile_size,
        )
    }

    /// Elevation at a coordinate.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(elevation))` - elevation in meters
    /// - `Ok(None)` - the tile has no data at this pixel
    /// - `Err(...)` - coordinates out of range, or the tile could not be loaded
    pub async fn elevation(&self, lon: f64, lat: f64) -> Result<Option<f64>> {
        self.sampler().elevation_at(lon, lat).await
    }

    /// Every plausible pixel sample inside `bbox`.
    pub async fn sample_points(&self, bbox: &BoundingBox) -> Result<Samples> {
        self.sampler().sample_grid(bbox).await
    }

    /// Samples on a regular step grid over `bbox`.
    pub async fn sample_steps(&self, bbox: &BoundingBox) -> Result<Samples> {
        self.sampler().sample_steps(bbox).await
    }

    /// Sample `bbox` and vectorize it with `strategy`.
    pub async fn contours(&self, bbox: &BoundingBox, strategy: Strategy) -> Result<ContourOutput> {
        let start = Instant::now();

        let output = match strategy {
            Strategy::Stripe => {
                let samples = self.sampler().sample_steps(bbox).await?;
                let (strips, strip_stats) = build_strips(&samples.points, &self.config.stripe);
                ContourOutput {
                    strategy,
                    batches: strip_batches(&strips, &self.config.stripe.scheme),
                    points_sampled: samples.points.len(),
                    sample_stats: samples.stats,
                    strip_stats: Some(strip_stats),
                    contour_count: 0,
                    elapsed_ms: 0,
                }
            }
            Strategy::Ring => {
                let (grid, sample_stats) = self.sampler().sample_raster(bbox).await?;
                let contours = build_rings(&grid, &self.config.ring)?;
                ContourOutput {
                    strategy,
                    batches: ring_batches(&contours, self.config.layer_offset),
                    points_sampled: grid.data_count(),
                    sample_stats,
                    strip_stats: None,
                    contour_count: contours.len(),
                    elapsed_ms: 0,
                }
            }
        };

        let output = ContourOutput {
            elapsed_ms: start.elapsed().as_millis() as u64,
            ..output
        };

        tracing::info!(
            %strategy,
            batches = output.batches.len(),
            points = output.points_sampled,
            elapsed_ms = output.elapsed_ms,
            "Contours built"
        );
        Ok(output)
    }

    /// Build contours for `bbox` and hand every batch to `renderer`.
    pub async fn render<R: Renderer + ?Sized>(
        &self,
        bbox: &BoundingBox,
        strategy: Strategy,
        renderer: &mut R,
    ) -> Result<ContourOutput> {
        let output = self.contours(bbox, strategy).await?;
        emit_all(&output.batches, renderer)?;
        Ok(output)
    }

    /// Load every tile covering `bbox` into the cache.
    ///
    /// Useful for warming the cache at startup. Tiles that fail are
    /// counted, not returned as errors.
    ///
    /// # Errors
    ///
    /// Only a box outside the Mercator range is an error.
    pub async fn preload(&self, bbox: &BoundingBox) -> Result<PreloadStats> {
        let start = Instant::now();
        let keys = tiles_covering(bbox, self.config.sampling.zoom)?;
        let mut stats = PreloadStats {
            tiles_matched: keys.len() as u64,
            ..Default::default()
        };

        for key in keys {
            if self.cache.contains(&key) {
                stats.tiles_already_cached += 1;
                continue;
            }
            match self.cache.get(key).await {
                Ok(_) => stats.tiles_loaded += 1,
                Err(_) => stats.tiles_failed += 1,
            }
        }

        stats.elapsed_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Get the maximum cache size.
    pub fn cache_capacity(&self) -> u64 {
        self.cache.capacity()
    }

    /// Clear all tiles from the cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl TopoService<TileSource> {
    /// Create a builder for more configuration options.
    pub fn builder() -> TopoServiceBuilder {
        TopoServiceBuilder::new()
    }
}

/// Builder for [`TopoService`].
///
/// # Example
///
/// ```ignore
/// use topoline::TopoServiceBuilder;
///
/// let service = TopoServiceBuilder::new()
///     .tile_url("https://tiles.example.com/terrain-rgb/{z}/{x}/{y}.png")
///     .timeout_secs(10)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct TopoServiceBuilder {
    config: TopoConfig,
    tile_dir: Option<PathBuf>,
    tile_url: Option<String>,
    timeout_secs: u64,
    max_retries: u32,
}

impl Default for TopoServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TopoServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: TopoConfig::default(),
            tile_dir: None,
            tile_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `TOPOLINE_TILE_DIR` | Directory of `{z}/{x}/{y}.png` tiles | None |
    /// | `TOPOLINE_TILE_URL` | Tile URL template with `{z}`, `{x}`, `{y}`* | None |
    /// | `TOPOLINE_ZOOM` | Sampling zoom level | 14 |
    /// | `TOPOLINE_CACHE_SIZE` | Maximum tiles in cache | 256 |
    /// | `TOPOLINE_SPACING_M` | Step and strip spacing in meters | 5 |
    /// | `TOPOLINE_CONTOUR_INTERVAL` | Contour interval in meters | 10 |
    /// | `TOPOLINE_TIMEOUT_SECS` | HTTP request timeout* | 30 |
    ///
    /// *Only used when the `http` feature is enabled.
    ///
    /// Unparseable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `TOPOLINE_TILE_DIR` nor `TOPOLINE_TILE_URL` is set.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<f64>().ok());

        let mut builder = Self::new();
        builder.tile_dir = lookup("TOPOLINE_TILE_DIR").map(PathBuf::from);
        builder.tile_url = lookup("TOPOLINE_TILE_URL");
        if builder.tile_dir.is_none() && builder.tile_url.is_none() {
            return Err(TopoError::InvalidConfig {
                reason: "set TOPOLINE_TILE_DIR or TOPOLINE_TILE_URL".to_string(),
            });
        }

        if let Some(zoom) = lookup("TOPOLINE_ZOOM").and_then(|v| v.trim().parse().ok()) {
            builder = builder.zoom(zoom);
        }
        if let Some(size) = lookup("TOPOLINE_CACHE_SIZE").and_then(|v| v.trim().parse().ok()) {
            builder = builder.cache_size(size);
        }
        if let Some(spacing) = number("TOPOLINE_SPACING_M") {
            builder = builder.spacing_m(spacing);
        }
        if let Some(interval) = number("TOPOLINE_CONTOUR_INTERVAL") {
            builder = builder.contour_interval(interval);
        }
        if let Some(secs) = lookup("TOPOLINE_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            builder = builder.timeout_secs(secs);
        }

        Ok(builder)
    }

    /// Read tiles from a local directory.
    pub fn tile_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.tile_dir = Some(path.as_ref().to_path_buf());
        self.tile_url = None;
        self
    }

    /// Fetch tiles over HTTP from a URL template (requires the `http` feature).
    pub fn tile_url(mut self, template: impl Into<String>) -> Self {
        self.tile_url = Some(template.into());
        self.tile_dir = None;
        self
    }

    pub fn zoom(mut self, zoom: u8) -> Self {
        self.config.sampling.zoom = zoom;
        self
    }

    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.config.sampling.tile_size = tile_size;
        self
    }

    /// Plausible elevation window used by sampling and strip filtering.
    pub fn valid_range(mut self, min: f64, max: f64) -> Self {
        let range = HeightRange::new(min, max);
        self.config.sampling.valid_range = range;
        self.config.stripe.valid_range = range;
        self
    }

    /// Ground spacing of step samples and strips, in meters.
    pub fn spacing_m(mut self, spacing_m: f64) -> Self {
        self.config.sampling.spacing_m = spacing_m;
        self.config.stripe.spacing_m = spacing_m;
        self
    }

    pub fn smoothing_window(mut self, window: usize) -> Self {
        self.config.stripe.smoothing_window = window;
        self
    }

    pub fn min_relief(mut self, meters: f64) -> Self {
        self.config.stripe.min_relief = meters;
        self
    }

    pub fn min_valid_ratio(mut self, ratio: f64) -> Self {
        self.config.stripe.min_valid_ratio = ratio;
        self
    }

    pub fn min_strip_points(mut self, count: usize) -> Self {
        self.config.stripe.min_points = count;
        self
    }

    pub fn color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.config.stripe.scheme = scheme;
        self
    }

    pub fn contour_interval(mut self, meters: f64) -> Self {
        self.config.ring.interval = meters;
        self
    }

    pub fn contour_stride(mut self, stride: usize) -> Self {
        self.config.ring.stride = stride;
        self
    }

    pub fn layer_offset(mut self, meters: f64) -> Self {
        self.config.layer_offset = meters;
        self
    }

    /// Set the maximum number of tiles to keep in cache.
    ///
    /// Default is 256 tiles.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.config.cache_size = size;
        self
    }

    /// HTTP request timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Retries after a failed HTTP request.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Returns the configuration built so far.
    pub fn config(&self) -> &TopoConfig {
        &self.config
    }

    /// Build the tile source named by `tile_dir` or `tile_url`.
    pub fn source(&self) -> Result<TileSource> {
        let tile_size = self.config.sampling.tile_size;

        if let Some(dir) = &self.tile_dir {
            return Ok(TileSource::Local(
                LocalFetcher::new(dir).with_tile_size(tile_size),
            ));
        }

        match &self.tile_url {
            #[cfg(feature = "http")]
            Some(template) => {
                let config = FetchConfig::with_url_template(template.clone())
                    .with_tile_size(tile_size)
                    .with_timeout(self.timeout_secs)
                    .with_max_retries(self.max_retries);
                Ok(TileSource::Http(HttpFetcher::new(config)?))
            }
            #[cfg(not(feature = "http"))]
            Some(template) => Err(TopoError::InvalidConfig {
                reason: format!(
                    "tile URL '{}' needs the http feature (retries: {}, timeout: {}s)",
                    template, self.max_retries, self.timeout_secs
                ),
            }),
            None => Err(TopoError::InvalidConfig {
                reason: "no tile source configured".to_string(),
            }),
        }
    }

    /// Build the [`TopoService`] over the configured tile source.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured, a setting is invalid,
    /// or the HTTP client cannot be created.
    pub fn build(self) -> Result<TopoService<TileSource>> {
        let source = self.source()?;
        TopoService::new(source, self.config)
    }

    /// Build the [`TopoService`] over a custom fetcher.
    pub fn build_with<F: TileFetcher>(self, fetcher: F) -> Result<TopoService<F>> {
        TopoService::new(fetcher, self.config)
    }
}
