//! GeoJSON output for segment batches.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use topoline::geojson::batches_to_feature_collection;
//!
//! let output = service.contours(&bbox, Strategy::Stripe).await?;
//! let collection = batches_to_feature_collection(&output.batches);
//! println!("{}", collection);
//! ```

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};

use crate::emit::SegmentBatch;
use crate::geo::Position;

/// Convert one batch into a 3-D `LineString` feature.
///
/// Properties carry the batch's `band`, its `color` as `#rrggbbaa` and
/// whether the line is `closed`.
pub fn batch_to_feature(batch: &SegmentBatch) -> Feature {
    let coords = batch.positions.iter().map(position_to_coord).collect();

    let mut properties = JsonObject::new();
    properties.insert("band".to_string(), batch.band.into());
    properties.insert("color".to_string(), batch.color.to_hex().into());
    properties.insert("closed".to_string(), batch.closed.into());

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::LineString(coords))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Convert batches into a feature collection, one feature per batch.
pub fn batches_to_feature_collection(batches: &[SegmentBatch]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: batches.iter().map(batch_to_feature).collect(),
        foreign_members: None,
    }
}

/// GeoJSON coordinate order: longitude, latitude, height.
fn position_to_coord(p: &Position) -> Vec<f64> {
    vec![p.lon, p.lat, p.height]
}
