//! # topoline - Terrain-RGB to Vector Lines
//!
//! Samples elevation from "terrain-RGB" raster tiles and vectorizes it into
//! colored 3-D line segments (contour rings or elevation-banded strips) ready
//! to drape over a globe.
//!
//! ## Features
//!
//! - **Slippy-map addressing**: Web Mercator tile/pixel math in both directions
//! - **Shared tile cache**: LRU-bounded, one fetch per tile even under concurrency
//! - **Two strategies**: threshold-band contour rings, or smoothed north-south
//!   strips split into color buckets
//! - **Pluggable I/O**: local tile directories, HTTP tile services (`http`
//!   feature), GeoJSON output (`geojson` feature)
//!
//! ## Quick Start
//!
//! ```ignore
//! use topoline::{BoundingBox, Strategy, TopoServiceBuilder};
//!
//! let service = TopoServiceBuilder::new()
//!     .tile_dir("/data/terrain-rgb")
//!     .build()?;
//!
//! let bbox = BoundingBox::new(103.80, -3.81, 103.85, -3.76)?;
//! let output = service.contours(&bbox, Strategy::Stripe).await?;
//! for batch in &output.batches {
//!     println!("band {} with {} positions", batch.band, batch.positions.len());
//! }
//! ```
//!
//! ## Terrain-RGB Format
//!
//! Each pixel's red, green and blue channels form a 24-bit integer:
//!
//! ```text
//! height = (r * 65536 + g * 256 + b) * 0.1 - 10000
//! ```
//!
//! The pixel `(0, 0, 0)` marks "no data". The alpha channel is ignored.

pub mod addressing;
pub mod bucket;
pub mod cache;
pub mod contour;
pub mod decode;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod grid;
pub mod sampler;
pub mod service;
pub mod smooth;
pub mod tile;

#[cfg(feature = "geojson")]
pub mod geojson;

// Re-export main types at crate root for convenience
pub use addressing::{lon_lat_to_tile, tile_to_lon_lat, TileKey, TilePosition};
pub use bucket::{Color, ColorScheme, HeightBand};
pub use cache::{CacheStats, TileCache};
pub use contour::{Contour, Strategy};
pub use decode::decode_elevation;
pub use emit::{Renderer, SegmentBatch};
pub use error::{Result, TopoError};
pub use fetch::{TileFetcher, TileSource};
pub use geo::{BoundingBox, GeoPoint, HeightRange, Position};
pub use service::{ContourOutput, PreloadStats, TopoConfig, TopoService, TopoServiceBuilder};
pub use smooth::smooth;
pub use tile::TileRaster;
