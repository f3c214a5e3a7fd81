//! Error types for the topoline library.

use thiserror::Error;

/// Errors that can occur while addressing, fetching or vectorizing terrain tiles.
///
/// The type is `Clone` because a failed tile fetch is shared by every caller
/// that was waiting on the same in-flight request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopoError {
    /// Latitude is outside the Web Mercator valid range.
    #[error("Latitude out of range: {lat} (valid: strictly within ±85.05°)")]
    LatitudeOutOfRange { lat: f64 },

    /// Longitude is outside [-180, 180].
    #[error("Longitude out of range: {lon} (valid: -180° to 180°)")]
    LongitudeOutOfRange { lon: f64 },

    /// Zoom level is beyond what the tile pyramid supports.
    #[error("Invalid zoom level: {zoom} (valid: 0 to {max})")]
    InvalidZoom { zoom: u8, max: u8 },

    /// Bounding box is empty, inverted or not finite.
    #[error(
        "Invalid bounding box: lon {min_lon}..{max_lon}, lat {min_lat}..{max_lat} (min must be below max)"
    )]
    InvalidBoundingBox {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },

    /// A configuration value cannot be used.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A tile key string could not be parsed.
    #[error("Invalid tile key: {input} (expected z/x/y)")]
    InvalidTileKey { input: String },

    /// Network or transport failure while fetching a tile.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The tile source has no tile at this key (missing file or HTTP 404).
    #[error("Tile not found: {location}")]
    TileNotFound { location: String },

    /// Tile bytes could not be decoded as an image.
    #[error("Failed to decode tile {key}: {reason}")]
    DecodeFailed { key: String, reason: String },

    /// Decoded tile does not have the configured resolution.
    #[error("Unexpected tile size {width}x{height} (expected {expected}x{expected})")]
    UnexpectedTileSize {
        width: u32,
        height: u32,
        expected: u32,
    },

    /// Tile service metadata could not be resolved.
    #[error("Failed to resolve tile metadata from {root}: {reason}")]
    MetadataFailed { root: String, reason: String },
}

/// Result type alias using [`TopoError`].
pub type Result<T> = std::result::Result<T, TopoError>;
