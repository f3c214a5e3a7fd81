//! Moving-average smoothing of elevation profiles.

use crate::geo::GeoPoint;

/// Smooth heights with a centered moving average.
///
/// Each output height is the mean over input indices `[i - window, i + window]`
/// that exist; near the ends fewer neighbors are averaged (no wraparound or
/// reflection). Positions are kept, and the input is not reordered: callers
/// sort along the profile axis first.
///
/// # Examples
///
/// ```
/// use topoline::{smooth, GeoPoint};
///
/// let points: Vec<GeoPoint> = [1.0, 2.0, 3.0, 4.0, 5.0]
///     .iter()
///     .enumerate()
///     .map(|(i, &h)| GeoPoint::new(0.0, i as f64, h))
///     .collect();
///
/// let smoothed = smooth(&points, 1);
/// assert_eq!(smoothed[0].height, 1.5);
/// assert_eq!(smoothed[2].height, 3.0);
/// ```
pub fn smooth(points: &[GeoPoint], window: usize) -> Vec<GeoPoint> {
    if window == 0 {
        return points.to_vec();
    }

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(points.len() - 1);
            let sum: f64 = points[lo..=hi].iter().map(|q| q.height).sum();
            p.with_height(sum / (hi - lo + 1) as f64)
        })
        .collect()
}
