//! Decoded terrain-RGB tile rasters.
//!
//! This module provides [`TileRaster`], the in-memory pixel grid the cache
//! stores for each tile, and the PNG decoding that produces it.

use crate::addressing::TileKey;
use crate::decode::decode_elevation;
use crate::error::{Result, TopoError};

/// A decoded square tile of RGB pixels.
///
/// Pixels are stored row-major, north row first. The alpha channel of the
/// source image carries no elevation and is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRaster {
    /// Width and height in pixels
    size: u32,
    /// Packed RGB triples, `size * size * 3` bytes
    pixels: Vec<u8>,
}

impl TileRaster {
    /// Build a raster from interleaved RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TopoError::UnexpectedTileSize`] if the buffer is not
    /// `width × height × 4` bytes of a square `expected_size` tile, and
    /// [`TopoError::InvalidConfig`] if `expected_size` is zero.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8], expected_size: u32) -> Result<Self> {
        check_size(expected_size)?;
        if width != expected_size
            || height != expected_size
            || rgba.len() != (width as usize) * (height as usize) * 4
        {
            return Err(TopoError::UnexpectedTileSize {
                width,
                height,
                expected: expected_size,
            });
        }

        let pixels = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();

        Ok(Self {
            size: expected_size,
            pixels,
        })
    }

    /// Decode encoded image bytes (PNG) into a raster.
    ///
    /// # Arguments
    ///
    /// * `key` - Tile the bytes belong to, used in error messages
    /// * `bytes` - Encoded image
    /// * `expected_size` - Required tile resolution in pixels
    pub fn from_image_bytes(key: TileKey, bytes: &[u8], expected_size: u32) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| TopoError::DecodeFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let rgba = image.to_rgba8();
        Self::from_rgba(rgba.width(), rgba.height(), rgba.as_raw(), expected_size)
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(size: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Result<Self> {
        check_size(size)?;
        let mut pixels = Vec::with_capacity((size as usize) * (size as usize) * 3);
        for y in 0..size {
            for x in 0..size {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Ok(Self { size, pixels })
    }

    /// Returns the width/height in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw RGB channels at a pixel. Coordinates are clamped to the tile.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let x = x.min(self.size - 1) as usize;
        let y = y.min(self.size - 1) as usize;
        let offset = (y * self.size as usize + x) * 3;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ]
    }

    /// Decoded elevation at a pixel, or `None` for no data.
    pub fn elevation_at(&self, x: u32, y: u32) -> Option<f64> {
        let [r, g, b] = self.pixel(x, y);
        decode_elevation(r, g, b)
    }
}

fn check_size(size: u32) -> Result<()> {
    if size == 0 {
        return Err(TopoError::InvalidConfig {
            reason: "tile size must be at least 1 pixel".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode_elevation;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(size: u32, height_m: f64) -> Vec<u8> {
        let [r, g, b] = encode_elevation(height_m);
        let image = RgbaImage::from_pixel(size, size, Rgba([r, g, b, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_from_rgba_drops_alpha() {
        let rgba = vec![1, 134, 160, 255, 0, 0, 0, 0, 1, 134, 170, 128, 9, 9, 9, 9];
        let raster = TileRaster::from_rgba(2, 2, &rgba, 2).unwrap();

        assert_eq!(raster.size(), 2);
        assert_eq!(raster.pixel(0, 0), [1, 134, 160]);
        assert_eq!(raster.elevation_at(0, 0), Some(0.0));
        assert_eq!(raster.elevation_at(1, 0), None);
        assert!((raster.elevation_at(0, 1).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_rgba_rejects_wrong_size() {
        let rgba = vec![0u8; 4 * 4 * 4];
        assert_eq!(
            TileRaster::from_rgba(4, 4, &rgba, 256),
            Err(TopoError::UnexpectedTileSize {
                width: 4,
                height: 4,
                expected: 256
            })
        );
        assert!(TileRaster::from_rgba(4, 4, &rgba[..10], 4).is_err());
    }

    #[test]
    fn test_from_png_bytes() {
        let key = TileKey::new(14, 12916, 8365);
        let raster = TileRaster::from_image_bytes(key, &png_bytes(256, 420.0), 256).unwrap();

        assert_eq!(raster.size(), 256);
        let h = raster.elevation_at(128, 128).unwrap();
        assert!((h - 420.0).abs() < 0.051);
    }

    #[test]
    fn test_from_garbage_bytes() {
        let key = TileKey::new(14, 1, 2);
        let err = TileRaster::from_image_bytes(key, b"not a png", 256).unwrap_err();
        assert!(matches!(err, TopoError::DecodeFailed { key, .. } if key == "14/1/2"));
    }

    #[test]
    fn test_pixel_clamps_to_edge() {
        let raster = TileRaster::from_fn(4, |x, y| [0, x as u8 + 1, y as u8]).unwrap();
        assert_eq!(raster.pixel(10, 10), [0, 4, 3]);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            TileRaster::from_fn(0, |_, _| [1, 134, 160]),
            Err(TopoError::InvalidConfig { .. })
        ));
        assert!(matches!(
            TileRaster::from_rgba(0, 0, &[], 0),
            Err(TopoError::InvalidConfig { .. })
        ));
    }
}
