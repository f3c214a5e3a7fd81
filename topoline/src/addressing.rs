//! Slippy-map tile addressing.
//!
//! Converts between geographic coordinates and Web Mercator tile indices with
//! pixel offsets, the scheme used by XYZ tile services.
//!
//! # Tile Scheme
//!
//! At zoom `z` the world is split into `2^z × 2^z` tiles. Tile `(0, 0)` is the
//! north-west corner; `x` grows eastwards and `y` grows southwards. Each tile
//! is a square raster of `tile_size` pixels (256 by default).
//!
//! The projection is undefined at the poles, so latitudes must lie strictly
//! within ±85.05°.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopoError};
use crate::geo::BoundingBox;

/// Latitude limit (exclusive) for Web Mercator addressing.
pub const MAX_LATITUDE: f64 = 85.05;

/// Highest supported zoom level.
pub const MAX_ZOOM: u8 = 24;

/// Default tile resolution in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Identifies a raster tile in the slippy-map pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Geographic extent of this tile.
    pub fn bounds(&self) -> BoundingBox {
        let (west, north) = tile_to_lon_lat(*self, 0.0, 0.0, 1);
        let (east, south) = tile_to_lon_lat(*self, 1.0, 1.0, 1);
        BoundingBox::from_edges(west, south, east, north)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileKey {
    type Err = TopoError;

    /// Parse a key in `z/x/y` form.
    ///
    /// # Examples
    ///
    /// ```
    /// use topoline::TileKey;
    ///
    /// let key: TileKey = "14/12915/8364".parse().unwrap();
    /// assert_eq!(key, TileKey::new(14, 12915, 8364));
    /// assert!("14/12915".parse::<TileKey>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TopoError::InvalidTileKey {
            input: s.to_string(),
        };

        let parts: Vec<&str> = s.trim().trim_matches('/').split('/').collect();
        let [z, x, y] = parts.as_slice() else {
            return Err(invalid());
        };

        let zoom: u8 = z.parse().map_err(|_| invalid())?;
        let x: u32 = x.parse().map_err(|_| invalid())?;
        let y: u32 = y.parse().map_err(|_| invalid())?;

        check_zoom(zoom)?;
        let n = tiles_per_axis(zoom);
        if x >= n || y >= n {
            return Err(invalid());
        }

        Ok(Self { zoom, x, y })
    }
}

/// A tile plus the pixel inside it that a coordinate falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TilePosition {
    pub key: TileKey,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

/// Number of tiles along one axis at `zoom`.
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

fn check_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(TopoError::InvalidZoom {
            zoom,
            max: MAX_ZOOM,
        });
    }
    Ok(())
}

/// Split a fractional tile coordinate into a tile index and a pixel offset.
fn split_tile_coord(t: f64, n: u32, tile_size: u32) -> (u32, u32) {
    // The eastern/southern edge belongs to the last tile.
    let index = (t.floor().max(0.0) as u32).min(n - 1);
    let frac = (t - index as f64).clamp(0.0, 1.0);
    let pixel = ((frac * tile_size as f64).floor() as u32).min(tile_size - 1);
    (index, pixel)
}

/// Convert a longitude/latitude to a tile index and pixel offset.
///
/// # Arguments
///
/// * `lon` - Longitude in decimal degrees (-180 to 180)
/// * `lat` - Latitude in decimal degrees, strictly within ±85.05
/// * `zoom` - Zoom level (0 to 24)
/// * `tile_size` - Tile resolution in pixels
///
/// # Errors
///
/// Returns a domain error for out-of-range coordinates, zoom or tile size.
///
/// # Examples
///
/// ```
/// use topoline::addressing::lon_lat_to_tile;
///
/// let pos = lon_lat_to_tile(0.0, 0.0, 1, 256).unwrap();
/// assert_eq!((pos.key.x, pos.key.y), (1, 1));
/// assert_eq!((pos.pixel_x, pos.pixel_y), (0, 0));
///
/// assert!(lon_lat_to_tile(0.0, 86.0, 1, 256).is_err());
/// ```
pub fn lon_lat_to_tile(lon: f64, lat: f64, zoom: u8, tile_size: u32) -> Result<TilePosition> {
    check_zoom(zoom)?;
    if tile_size == 0 {
        return Err(TopoError::InvalidConfig {
            reason: "tile size must be positive".to_string(),
        });
    }
    if !(lat.abs() < MAX_LATITUDE) {
        return Err(TopoError::LatitudeOutOfRange { lat });
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(TopoError::LongitudeOutOfRange { lon });
    }

    let n = tiles_per_axis(zoom);
    let nf = n as f64;
    let xt = nf * (lon + 180.0) / 360.0;
    let yt = nf * (1.0 - lat.to_radians().tan().asinh() / PI) / 2.0;

    let (x, pixel_x) = split_tile_coord(xt, n, tile_size);
    let (y, pixel_y) = split_tile_coord(yt, n, tile_size);

    Ok(TilePosition {
        key: TileKey::new(zoom, x, y),
        pixel_x,
        pixel_y,
    })
}

/// Convert a tile index and pixel offset back to longitude/latitude.
///
/// Pixel offsets may be fractional: `(0.0, 0.0)` is the tile's north-west
/// corner and `(px + 0.5, py + 0.5)` is the center of pixel `(px, py)`.
///
/// # Examples
///
/// ```
/// use topoline::addressing::tile_to_lon_lat;
/// use topoline::TileKey;
///
/// let (lon, lat) = tile_to_lon_lat(TileKey::new(1, 1, 1), 0.0, 0.0, 256);
/// assert!(lon.abs() < 1e-9);
/// assert!(lat.abs() < 1e-9);
/// ```
pub fn tile_to_lon_lat(key: TileKey, pixel_x: f64, pixel_y: f64, tile_size: u32) -> (f64, f64) {
    let n = tiles_per_axis(key.zoom) as f64;
    let size = tile_size.max(1) as f64;

    let xt = key.x as f64 + pixel_x / size;
    let yt = key.y as f64 + pixel_y / size;

    let lon = xt / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * yt / n)).sinh().atan().to_degrees();
    (lon, lat)
}

/// All tiles at `zoom` that intersect `bbox`, in row-major order (north to south).
///
/// # Errors
///
/// Returns a domain error if the box reaches beyond the Mercator latitude limit.
pub fn tiles_covering(bbox: &BoundingBox, zoom: u8) -> Result<Vec<TileKey>> {
    let north_west = lon_lat_to_tile(bbox.min_lon(), bbox.max_lat(), zoom, DEFAULT_TILE_SIZE)?;
    let south_east = lon_lat_to_tile(bbox.max_lon(), bbox.min_lat(), zoom, DEFAULT_TILE_SIZE)?;

    let mut keys = Vec::new();
    for y in north_west.key.y..=south_east.key.y {
        for x in north_west.key.x..=south_east.key.x {
            keys.push(TileKey::new(zoom, x, y));
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COORDS: [(f64, f64); 7] = [
        (103.80, -3.81),
        (103.85, -3.76),
        (138.7274, 35.3606),
        (-122.4194, 37.7749),
        (-0.1, 51.5),
        (179.99, -85.0),
        (-180.0, 85.0),
    ];

    #[test]
    fn test_origin_tiles() {
        let pos = lon_lat_to_tile(-180.0, 0.0, 0, 256).unwrap();
        assert_eq!(pos.key, TileKey::new(0, 0, 0));
        assert_eq!(pos.pixel_x, 0);
        assert_eq!(pos.pixel_y, 128);
    }

    #[test]
    fn test_known_tile() {
        // Zoom 14 around Lahat, South Sumatra
        let pos = lon_lat_to_tile(103.80, -3.81, 14, 256).unwrap();
        assert_eq!(pos.key.zoom, 14);
        assert_eq!(pos.key.x, 12916);
        assert_eq!(pos.key.y, 8365);
        assert!(pos.key.y > 8192, "southern hemisphere lies below the equator row");
        assert!(pos.pixel_x < 256 && pos.pixel_y < 256);
    }

    #[test]
    fn test_eastern_edge_clamps_to_last_tile() {
        let pos = lon_lat_to_tile(180.0, 0.0, 2, 256).unwrap();
        assert_eq!(pos.key.x, 3);
        assert_eq!(pos.pixel_x, 255);
    }

    #[test]
    fn test_domain_errors() {
        assert_eq!(
            lon_lat_to_tile(0.0, 85.05, 14, 256),
            Err(TopoError::LatitudeOutOfRange { lat: 85.05 })
        );
        assert!(lon_lat_to_tile(0.0, -90.0, 14, 256).is_err());
        assert!(lon_lat_to_tile(0.0, f64::NAN, 14, 256).is_err());
        assert_eq!(
            lon_lat_to_tile(181.0, 0.0, 14, 256),
            Err(TopoError::LongitudeOutOfRange { lon: 181.0 })
        );
        assert!(matches!(
            lon_lat_to_tile(0.0, 0.0, 25, 256),
            Err(TopoError::InvalidZoom { zoom: 25, .. })
        ));
        assert!(lon_lat_to_tile(0.0, 0.0, 14, 0).is_err());
    }

    #[test]
    fn test_roundtrip_pixel_center_is_stable() {
        for zoom in [0u8, 5, 10, 14, 18] {
            for (lon, lat) in COORDS {
                let pos = lon_lat_to_tile(lon, lat, zoom, 256).unwrap();
                let (lon2, lat2) = tile_to_lon_lat(
                    pos.key,
                    pos.pixel_x as f64 + 0.5,
                    pos.pixel_y as f64 + 0.5,
                    256,
                );
                let pos2 = lon_lat_to_tile(lon2, lat2, zoom, 256).unwrap();
                assert_eq!(pos2, pos, "zoom {} at ({}, {})", zoom, lon, lat);
            }
        }
    }

    #[test]
    fn test_roundtrip_within_one_pixel() {
        for zoom in [3u8, 14, 20] {
            for (lon, lat) in COORDS {
                let pos = lon_lat_to_tile(lon, lat, zoom, 256).unwrap();
                let px = pos.pixel_x as f64;
                let py = pos.pixel_y as f64;
                let (lon2, lat2) = tile_to_lon_lat(pos.key, px, py, 256);

                // Angular size of the pixel the coordinate fell on
                let (lon_next, lat_next) = tile_to_lon_lat(pos.key, px + 1.0, py + 1.0, 256);
                let lon_tol = (lon_next - lon2).abs() + 1e-9;
                let lat_tol = (lat_next - lat2).abs() + 1e-9;

                assert!((lon2 - lon).abs() <= lon_tol, "lon at zoom {}", zoom);
                assert!((lat2 - lat).abs() <= lat_tol, "lat at zoom {}", zoom);
            }
        }
    }

    #[test]
    fn test_tile_bounds() {
        let bounds = TileKey::new(1, 0, 0).bounds();
        assert!((bounds.min_lon() + 180.0).abs() < 1e-9);
        assert!(bounds.max_lon().abs() < 1e-9);
        assert!(bounds.min_lat().abs() < 1e-9);
        assert!(bounds.max_lat() > 85.0);
    }

    #[test]
    fn test_tiles_covering() {
        let bbox = BoundingBox::new(103.80, -3.81, 103.85, -3.76).unwrap();
        let keys = tiles_covering(&bbox, 14).unwrap();
        assert!(!keys.is_empty());
        // x 12916..=12918, y 8363..=8365
        assert_eq!(keys.len(), 9);
        assert_eq!(keys[0], TileKey::new(14, 12916, 8363));
        for key in &keys {
            assert_eq!(key.zoom, 14);
        }

        let small = BoundingBox::new(0.0001, 0.0001, 0.0002, 0.0002).unwrap();
        assert_eq!(tiles_covering(&small, 10).unwrap().len(), 1);

        let polar = BoundingBox::new(0.0, 80.0, 1.0, 89.0).unwrap();
        assert!(tiles_covering(&polar, 10).is_err());
    }

    #[test]
    fn test_display_and_parse() {
        let key = TileKey::new(14, 12915, 8364);
        assert_eq!(key.to_string(), "14/12915/8364");
        assert_eq!(key.to_string().parse::<TileKey>().unwrap(), key);
        assert!("14/99999/1".parse::<TileKey>().is_err());
        assert!("a/b/c".parse::<TileKey>().is_err());
        assert!("30/0/0".parse::<TileKey>().is_err());
    }
}
