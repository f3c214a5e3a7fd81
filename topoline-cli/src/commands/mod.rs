pub mod contours;
pub mod elevation;
pub mod metadata;
pub mod points;
pub mod tile;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use topoline::{TileSource, TopoService, TopoServiceBuilder};

/// Tile source and cache options shared by the subcommands.
pub struct SourceArgs {
    pub tile_url: Option<String>,
    pub tile_dir: Option<PathBuf>,
    pub zoom: u8,
    pub cache_size: u64,
}

impl SourceArgs {
    /// Service builder for the configured tile source.
    pub fn builder(&self) -> Result<TopoServiceBuilder> {
        let builder = match (&self.tile_url, &self.tile_dir) {
            (Some(url), _) => TopoServiceBuilder::new().tile_url(url.as_str()),
            (None, Some(dir)) => TopoServiceBuilder::new().tile_dir(dir),
            (None, None) => bail!(
                "No tile source configured. Use --tile-url or --tile-dir, \
                 or set TOPOLINE_TILE_URL or TOPOLINE_TILE_DIR"
            ),
        };
        Ok(builder.zoom(self.zoom).cache_size(self.cache_size))
    }

    pub fn build(&self) -> Result<TopoService<TileSource>> {
        self.builder()?
            .build()
            .context("Failed to create topoline service")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tile_url: Option<&str>, tile_dir: Option<&str>) -> SourceArgs {
        SourceArgs {
            tile_url: tile_url.map(String::from),
            tile_dir: tile_dir.map(PathBuf::from),
            zoom: 12,
            cache_size: 32,
        }
    }

    #[test]
    fn test_no_source_is_an_error() {
        let err = args(None, None).builder().err().unwrap();
        assert!(err.to_string().contains("--tile-dir"));
    }

    #[test]
    fn test_tile_dir_source() {
        let service = args(None, Some("/tmp/tiles")).build().unwrap();
        assert_eq!(service.config().sampling.zoom, 12);
        assert_eq!(service.cache_capacity(), 32);
    }

    #[test]
    fn test_bad_tile_url_is_an_error() {
        assert!(args(Some("http://localhost/tiles"), None).build().is_err());
    }

    #[test]
    fn test_zero_cache_size_is_an_error() {
        let mut source = args(None, Some("/tmp/tiles"));
        source.cache_size = 0;
        assert!(source.build().is_err());
    }
}
