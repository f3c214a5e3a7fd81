//! Tile fetching.
//!
//! The pipeline never talks to the network or the filesystem directly; it asks
//! a [`TileFetcher`] for decoded rasters. Two sources are provided:
//!
//! - [`LocalFetcher`]: PNG tiles stored on disk as `{root}/{z}/{x}/{y}.png`
//! - [`HttpFetcher`]: an XYZ tile service addressed by a URL template
//!   (requires the `http` feature)
//!
//! [`TileSource`] wraps either one so callers can pick at runtime.
//!
//! # URL Template Placeholders
//!
//! - `{z}` - Zoom level
//! - `{x}` - Tile column
//! - `{y}` - Tile row
//!
//! ```ignore
//! use topoline::fetch::{FetchConfig, HttpFetcher};
//!
//! let fetcher = HttpFetcher::new(FetchConfig::with_url_template(
//!     "http://localhost:8080/terrain-rgb/tiles/{z}/{x}/{y}",
//! ))?;
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::addressing::{TileKey, DEFAULT_TILE_SIZE};
use crate::error::{Result, TopoError};
use crate::geo::BoundingBox;
use crate::tile::TileRaster;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after a failed request.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Source of decoded tile rasters.
///
/// Implementations fetch and decode one tile per call. Caching and request
/// de-duplication are the job of [`TileCache`](crate::TileCache), not of the
/// fetcher.
pub trait TileFetcher: Send + Sync {
    /// Fetch and decode the tile identified by `key`.
    fn fetch(&self, key: TileKey) -> impl Future<Output = Result<TileRaster>> + Send;
}

/// Substitute `{z}`, `{x}` and `{y}` in a tile URL or path template.
pub fn expand_template(template: &str, key: TileKey) -> String {
    template
        .replace("{z}", &key.zoom.to_string())
        .replace("{x}", &key.x.to_string())
        .replace("{y}", &key.y.to_string())
}

fn check_template(template: &str) -> Result<()> {
    let missing: Vec<&str> = ["{z}", "{x}", "{y}"]
        .into_iter()
        .filter(|p| !template.contains(p))
        .collect();
    if !missing.is_empty() {
        return Err(TopoError::InvalidConfig {
            reason: format!(
                "tile URL template '{}' is missing {}",
                template,
                missing.join(", ")
            ),
        });
    }
    Ok(())
}

/// Reads PNG tiles from a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    root: PathBuf,
    tile_size: u32,
}

impl LocalFetcher {
    /// Create a fetcher for tiles stored as `{root}/{z}/{x}/{y}.png`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Set the expected tile resolution.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn tile_path(&self, key: TileKey) -> PathBuf {
        self.root
            .join(key.zoom.to_string())
            .join(key.x.to_string())
            .join(format!("{}.png", key.y))
    }
}

impl TileFetcher for LocalFetcher {
    async fn fetch(&self, key: TileKey) -> Result<TileRaster> {
        let path = self.tile_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TopoError::TileNotFound {
                    location: path.display().to_string(),
                });
            }
            Err(e) => {
                return Err(TopoError::FetchFailed {
                    url: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        TileRaster::from_image_bytes(key, &bytes, self.tile_size)
    }
}

/// Configuration for fetching tiles over HTTP.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    /// Expected tile resolution in pixels.
    pub tile_size: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of retry attempts on failure.
    pub max_retries: u32,
}

impl FetchConfig {
    /// Create a configuration for a tile URL template.
    pub fn with_url_template(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            tile_size: DEFAULT_TILE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the expected tile resolution.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }
}

/// Fetches terrain-RGB tiles from an XYZ tile service.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL template lacks a placeholder or the HTTP
    /// client cannot be created.
    pub fn new(config: FetchConfig) -> Result<Self> {
        check_template(&config.url_template)?;
        let client = http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Returns the fetch configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// URL of the tile identified by `key`.
    pub fn tile_url(&self, key: TileKey) -> String {
        expand_template(&self.config.url_template, key)
    }

    async fn do_fetch(&self, key: TileKey, url: &str) -> Result<TileRaster> {
        let failed = |reason: String| TopoError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TopoError::TileNotFound {
                location: url.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        TileRaster::from_image_bytes(key, &bytes, self.config.tile_size)
    }
}

#[cfg(feature = "http")]
fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TopoError::InvalidConfig {
            reason: format!("Failed to create HTTP client: {}", e),
        })
}

#[cfg(feature = "http")]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, key: TileKey) -> Result<TileRaster> {
        let url = self.tile_url(key);

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(250 * attempt as u64)).await;
            }

            match self.do_fetch(key, &url).await {
                Ok(raster) => return Ok(raster),
                // Missing tiles and broken image bytes will not fix themselves
                Err(e @ TopoError::TileNotFound { .. })
                | Err(e @ TopoError::DecodeFailed { .. })
                | Err(e @ TopoError::UnexpectedTileSize { .. }) => return Err(e),
                Err(e) => {
                    tracing::debug!(%key, attempt, error = %e, "Tile fetch attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TopoError::FetchFailed {
            url,
            reason: "Unknown error".to_string(),
        }))
    }
}

/// A tile source chosen at runtime.
#[derive(Debug, Clone)]
pub enum TileSource {
    /// Tiles on local disk.
    Local(LocalFetcher),
    /// Tiles from an HTTP tile service.
    #[cfg(feature = "http")]
    Http(HttpFetcher),
}

impl TileSource {
    /// Human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            TileSource::Local(local) => local.root().display().to_string(),
            #[cfg(feature = "http")]
            TileSource::Http(http) => http.config().url_template.clone(),
        }
    }
}

impl TileFetcher for TileSource {
    async fn fetch(&self, key: TileKey) -> Result<TileRaster> {
        match self {
            TileSource::Local(local) => local.fetch(key).await,
            #[cfg(feature = "http")]
            TileSource::Http(http) => http.fetch(key).await,
        }
    }
}

/// Tile service description resolved from its root.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMetadata {
    /// Area covered by the service.
    pub bounds: BoundingBox,
    /// Absolute tile URL template with `{z}/{x}/{y}` placeholders.
    pub tile_url_template: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

#[derive(Debug, Deserialize)]
struct TileJson {
    tiles: Vec<String>,
    #[serde(default)]
    bounds: Option<[f64; 4]>,
    #[serde(default)]
    minzoom: Option<u8>,
    #[serde(default)]
    maxzoom: Option<u8>,
}

impl TileMetadata {
    /// Resolve a tile service root to its bounds and URL template.
    ///
    /// The root must serve a TileJSON document.
    #[cfg(feature = "http")]
    pub async fn resolve(root: &str, timeout_secs: u64) -> Result<Self> {
        let failed = |reason: String| TopoError::MetadataFailed {
            root: root.to_string(),
            reason,
        };

        let response = http_client(timeout_secs)?
            .get(root)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        let body = response.text().await.map_err(|e| failed(e.to_string()))?;

        Self::from_tilejson(&body, root)
    }

    /// Parse a TileJSON document served at `root`.
    ///
    /// Relative tile URLs are resolved against `root`. Missing bounds default
    /// to the whole Mercator world.
    ///
    /// # Examples
    ///
    /// ```
    /// use topoline::fetch::TileMetadata;
    ///
    /// let json = r#"{"tiles": ["tiles/{z}/{x}/{y}"], "bounds": [103.8, -3.81, 103.85, -3.76]}"#;
    /// let meta = TileMetadata::from_tilejson(json, "http://localhost:8080/terrain-rgb").unwrap();
    /// assert_eq!(meta.tile_url_template, "http://localhost:8080/terrain-rgb/tiles/{z}/{x}/{y}");
    /// ```
    pub fn from_tilejson(json: &str, root: &str) -> Result<Self> {
        let failed = |reason: String| TopoError::MetadataFailed {
            root: root.to_string(),
            reason,
        };

        let doc: TileJson = serde_json::from_str(json).map_err(|e| failed(e.to_string()))?;

        let template = doc
            .tiles
            .first()
            .ok_or_else(|| failed("TileJSON lists no tile URLs".to_string()))?;
        let tile_url_template = if template.starts_with("http://") || template.starts_with("https://")
        {
            template.clone()
        } else {
            format!(
                "{}/{}",
                root.trim_end_matches('/'),
                template.trim_start_matches('/')
            )
        };
        check_template(&tile_url_template).map_err(|e| failed(e.to_string()))?;

        let [west, south, east, north] = doc.bounds.unwrap_or([-180.0, -85.0, 180.0, 85.0]);
        let bounds =
            BoundingBox::new(west, south, east, north).map_err(|e| failed(e.to_string()))?;

        Ok(Self {
            bounds,
            tile_url_template,
            min_zoom: doc.minzoom.unwrap_or(0),
            max_zoom: doc.maxzoom.unwrap_or(crate::addressing::MAX_ZOOM),
        })
    }
}
