//! Dense elevation grids for the ring contour strategy.

use crate::error::{Result, TopoError};
use crate::geo::{BoundingBox, HeightRange};
use crate::tile::TileRaster;

/// A row-major grid of elevations covering a bounding box.
///
/// Row 0 is the northern edge. Cells holding `NaN` have no data. Cell
/// positions are mapped linearly over the bounds, which is close enough to
/// the Mercator projection at the scale of a few tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
    bounds: BoundingBox,
}

impl ElevationGrid {
    /// Create a grid from row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`TopoError::InvalidConfig`] if `values` does not hold
    /// exactly `width × height` cells.
    pub fn new(width: usize, height: usize, values: Vec<f64>, bounds: BoundingBox) -> Result<Self> {
        if values.len() != width * height {
            return Err(TopoError::InvalidConfig {
                reason: format!(
                    "grid of {}x{} needs {} values, got {}",
                    width,
                    height,
                    width * height,
                    values.len()
                ),
            });
        }

        Ok(Self {
            width,
            height,
            values,
            bounds,
        })
    }

    /// A grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, bounds: BoundingBox, value: f64) -> Self {
        Self {
            width,
            height,
            values: vec![value; width * height],
            bounds,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Elevation at a cell, `NaN` for no data or out of range indices.
    pub fn get(&self, col: usize, row: usize) -> f64 {
        if col >= self.width || row >= self.height {
            return f64::NAN;
        }
        self.values[row * self.width + col]
    }

    /// Set a cell. Out of range indices are ignored.
    pub fn set(&mut self, col: usize, row: usize, value: f64) {
        if col < self.width && row < self.height {
            self.values[row * self.width + col] = value;
        }
    }

    /// Copy a decoded tile into the grid with its north-west pixel at
    /// `(col, row)`.
    ///
    /// Pixels without data or outside `valid` become `NaN`, so a corrupt
    /// pixel cannot inflate the contour level count.
    pub fn blit(&mut self, col: usize, row: usize, tile: &TileRaster, valid: &HeightRange) {
        let size = tile.size() as usize;
        for py in 0..size {
            for px in 0..size {
                let value = tile
                    .elevation_at(px as u32, py as u32)
                    .filter(|h| valid.contains(*h))
                    .unwrap_or(f64::NAN);
                self.set(col + px, row + py, value);
            }
        }
    }

    /// Geographic position of a cell center.
    pub fn cell_position(&self, col: usize, row: usize) -> (f64, f64) {
        let fx = (col as f64 + 0.5) / self.width.max(1) as f64;
        let fy = (row as f64 + 0.5) / self.height.max(1) as f64;
        let lon = self.bounds.min_lon() + fx * self.bounds.width();
        let lat = self.bounds.max_lat() - fy * self.bounds.height();
        (lon, lat)
    }

    /// Highest elevation in the grid, ignoring no-data cells.
    pub fn max_elevation(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .max_by(f64::total_cmp)
    }

    /// Number of cells holding data.
    pub fn data_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode_elevation;

    fn bounds() -> BoundingBox {
        BoundingBox::new(103.80, -3.81, 103.85, -3.76).unwrap()
    }

    #[test]
    fn test_new_checks_length() {
        assert!(ElevationGrid::new(2, 2, vec![0.0; 4], bounds()).is_ok());
        assert!(matches!(
            ElevationGrid::new(2, 2, vec![0.0; 3], bounds()),
            Err(TopoError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_cell_position_north_row_first() {
        let grid = ElevationGrid::filled(10, 10, bounds(), 0.0);

        let (lon, lat) = grid.cell_position(0, 0);
        assert!((lon - 103.8025).abs() < 1e-9);
        assert!((lat - -3.7625).abs() < 1e-9);

        let (lon, lat) = grid.cell_position(9, 9);
        assert!((lon - 103.8475).abs() < 1e-9);
        assert!((lat - -3.8075).abs() < 1e-9);
    }

    #[test]
    fn test_max_elevation_ignores_no_data() {
        let mut grid = ElevationGrid::filled(3, 3, bounds(), f64::NAN);
        assert_eq!(grid.max_elevation(), None);

        grid.set(1, 1, 42.0);
        grid.set(2, 0, -7.0);
        assert_eq!(grid.max_elevation(), Some(42.0));
        assert_eq!(grid.data_count(), 2);
        assert!(grid.get(5, 5).is_nan());
    }

    #[test]
    fn test_blit_filters_implausible_pixels() {
        let tile = TileRaster::from_fn(2, |x, _| match x {
            0 => encode_elevation(150.0),
            _ => [255, 255, 255],
        })
        .unwrap();
        let mut grid = ElevationGrid::filled(4, 2, bounds(), f64::NAN);
        grid.blit(2, 0, &tile, &HeightRange::default());

        assert!(grid.get(0, 0).is_nan());
        assert!((grid.get(2, 1) - 150.0).abs() < 0.051);
        assert!(grid.get(3, 0).is_nan());
    }
}
