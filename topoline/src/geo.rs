//! Geographic primitives shared by every pipeline stage.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopoError};

/// An elevation sample at a geographic position.
///
/// `height` is in meters; `NaN` marks a sample with no usable elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Elevation in meters, or `NaN` for no data.
    pub height: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64, height: f64) -> Self {
        Self { lon, lat, height }
    }

    /// A point whose elevation is unknown.
    pub fn no_data(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, f64::NAN)
    }

    /// Returns a copy of this point with a different height.
    pub fn with_height(self, height: f64) -> Self {
        Self { height, ..self }
    }

    pub fn has_data(&self) -> bool {
        !self.height.is_nan()
    }
}

/// A 3-D vertex handed to a renderer: degrees plus meters above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64, height: f64) -> Self {
        Self { lon, lat, height }
    }

    /// Same position lifted by `offset` meters.
    pub fn raised(self, offset: f64) -> Self {
        Self {
            height: self.height + offset,
            ..self
        }
    }
}

impl From<GeoPoint> for Position {
    fn from(p: GeoPoint) -> Self {
        Self::new(p.lon, p.lat, p.height)
    }
}

/// A geographic bounding box in decimal degrees (WGS84).
///
/// The constructor guarantees `min_lon < max_lon` and `min_lat < max_lat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// Arguments follow GeoJSON `bbox` order: west, south, east, north.
    ///
    /// # Errors
    ///
    /// Returns [`TopoError::InvalidBoundingBox`] if any value is not finite
    /// or a minimum is not strictly below its maximum.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let finite = [min_lon, min_lat, max_lon, max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !finite || min_lon >= max_lon || min_lat >= max_lat {
            return Err(TopoError::InvalidBoundingBox {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Box from edges already known to be ordered (e.g. tile extents).
    pub(crate) fn from_edges(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Parse `min_lon,min_lat,max_lon,max_lat`.
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<f64> = value
            .split(',')
            .filter_map(|s| s.trim().parse::<f64>().ok())
            .collect();
        match parts.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                Self::new(*min_lon, *min_lat, *max_lon, *max_lat)
            }
            _ => Err(TopoError::InvalidConfig {
                reason: format!(
                    "bounding box '{}' must be min_lon,min_lat,max_lon,max_lat",
                    value
                ),
            }),
        }
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check whether a point lies inside the box (edges included).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// The window of elevations considered plausible.
///
/// Both bounds are exclusive, and `NaN` is never contained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightRange {
    pub min: f64,
    pub max: f64,
}

impl HeightRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, height: f64) -> bool {
        height > self.min && height < self.max
    }
}

impl Default for HeightRange {
    fn default() -> Self {
        Self::new(-100.0, 3000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_validation() {
        assert!(BoundingBox::new(103.80, -3.81, 103.85, -3.76).is_ok());
        assert!(BoundingBox::new(103.85, -3.81, 103.80, -3.76).is_err());
        assert!(BoundingBox::new(103.80, -3.76, 103.85, -3.76).is_err());
        assert!(BoundingBox::new(f64::NAN, -3.81, 103.85, -3.76).is_err());
    }

    #[test]
    fn test_bounding_box_parse() {
        let bbox = BoundingBox::parse("103.80, -3.81, 103.85, -3.76").unwrap();
        assert_eq!(bbox.min_lon(), 103.80);
        assert_eq!(bbox.max_lat(), -3.76);
        assert!((bbox.width() - 0.05).abs() < 1e-9);

        assert!(matches!(
            BoundingBox::parse("1,2,3"),
            Err(TopoError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_height_range_is_exclusive() {
        let range = HeightRange::default();
        assert!(range.contains(0.0));
        assert!(!range.contains(-100.0));
        assert!(!range.contains(3000.0));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_geo_point_no_data() {
        let p = GeoPoint::no_data(1.0, 2.0);
        assert!(!p.has_data());
        assert!(p.with_height(5.0).has_data());
    }
}
