//! LRU tile cache with in-flight request de-duplication.
//!
//! [`TileCache`] memoizes decoded rasters by [`TileKey`]. Concurrent requests
//! for a tile that is not cached yet share a single fetch; a failed fetch is
//! not stored, so the next request tries again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::addressing::TileKey;
use crate::error::Result;
use crate::fetch::TileFetcher;
use crate::tile::TileRaster;

/// Default number of tiles kept in memory.
pub const DEFAULT_CACHE_SIZE: u64 = 256;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of tiles currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (requests served from cache).
    pub hit_count: u64,
    /// Number of cache misses (requests that had to wait for a fetch).
    pub miss_count: u64,
    /// Number of fetches actually issued to the tile source.
    pub fetch_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Bounded cache of decoded tiles in front of a [`TileFetcher`].
///
/// # Example
///
/// ```ignore
/// use topoline::{TileCache, TileKey};
/// use topoline::fetch::LocalFetcher;
///
/// let cache = TileCache::new(LocalFetcher::new("/data/terrain-rgb"), 100);
/// let tile = cache.get(TileKey::new(14, 12916, 8365)).await?;
/// println!("Elevation at center: {:?}", tile.elevation_at(128, 128));
/// ```
pub struct TileCache<F> {
    fetcher: F,
    /// LRU cache of decoded tiles.
    tiles: Cache<TileKey, Arc<TileRaster>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    fetch_count: AtomicU64,
}

impl<F: TileFetcher> TileCache<F> {
    /// Create a cache holding at most `capacity` tiles.
    pub fn new(fetcher: F, capacity: u64) -> Self {
        Self {
            fetcher,
            tiles: Cache::builder()
                .max_capacity(capacity)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Get a tile, fetching it on a miss.
    ///
    /// Callers that miss on the same key while a fetch is in flight wait for
    /// that fetch and receive the same raster.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's error. Nothing is cached on failure.
    pub async fn get(&self, key: TileKey) -> Result<Arc<TileRaster>> {
        if let Some(tile) = self.tiles.get(&key).await {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(tile);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);

        self.tiles
            .try_get_with(key, async {
                self.fetch_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%key, "Fetching tile");
                self.fetcher.fetch(key).await.map(Arc::new)
            })
            .await
            .map_err(|e| {
                tracing::warn!(%key, error = %e, "Tile fetch failed");
                (*e).clone()
            })
    }

    /// Check whether a tile is cached without fetching it.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.tiles.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            fetch_count: self.fetch_count.load(Ordering::Relaxed),
        }
    }

    /// Get the maximum number of cached tiles.
    pub fn capacity(&self) -> u64 {
        self.tiles.policy().max_capacity().unwrap_or(0)
    }

    /// Remove a single tile from the cache.
    pub async fn invalidate(&self, key: &TileKey) {
        self.tiles.invalidate(key).await;
    }

    /// Remove every tile from the cache.
    pub fn clear(&self) {
        self.tiles.invalidate_all();
    }

    /// Apply pending evictions so `stats().entry_count` is exact.
    pub async fn sync(&self) {
        self.tiles.run_pending_tasks().await;
    }

    /// Returns the underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}
