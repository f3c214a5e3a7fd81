//! Terrain-RGB elevation decoding.
//!
//! Terrain-RGB tiles pack elevation into the three 8-bit color channels:
//!
//! ```text
//! elevation = (R × 65536 + G × 256 + B) × 0.1 − 10000
//! ```
//!
//! giving 0.1 m resolution from −10000 m up to [`MAX_ELEVATION`]. The black
//! pixel `(0, 0, 0)` is reserved to mean "no data".

/// Elevation of the lowest encodable value (meters).
pub const MIN_ELEVATION: f64 = -10000.0;

/// Elevation of `(255, 255, 255)` in meters.
pub const MAX_ELEVATION: f64 = 1_667_721.5;

/// Vertical resolution of the encoding (meters per step).
pub const ELEVATION_STEP: f64 = 0.1;

/// The reserved no-data pixel.
pub const NO_DATA_PIXEL: [u8; 3] = [0, 0, 0];

/// Decode a terrain-RGB pixel to an elevation in meters.
///
/// Returns `None` for the no-data sentinel `(0, 0, 0)`. Every other input
/// decodes to a finite elevation.
///
/// # Examples
///
/// ```
/// use topoline::decode::decode_elevation;
///
/// assert_eq!(decode_elevation(0, 0, 0), None);
/// assert_eq!(decode_elevation(1, 134, 160), Some(0.0));
/// assert_eq!(decode_elevation(255, 255, 255), Some(1_667_721.5));
/// ```
pub fn decode_elevation(r: u8, g: u8, b: u8) -> Option<f64> {
    if [r, g, b] == NO_DATA_PIXEL {
        return None;
    }

    let raw = (r as u32) << 16 | (g as u32) << 8 | b as u32;
    Some(raw as f64 * ELEVATION_STEP + MIN_ELEVATION)
}

/// Encode an elevation as a terrain-RGB pixel.
///
/// Values are rounded to the nearest 0.1 m and clamped to the encodable range.
/// The minimum (−10000 m) encodes to the no-data pixel, so it cannot be
/// represented as a real elevation.
pub fn encode_elevation(height: f64) -> [u8; 3] {
    let steps = ((height - MIN_ELEVATION) * 10.0).round();
    let raw = steps.clamp(0.0, 16_777_215.0) as u32;
    [(raw >> 16) as u8, (raw >> 8) as u8, raw as u8]
}
