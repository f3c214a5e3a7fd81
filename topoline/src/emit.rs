//! Packaging of contours and strips into renderer-ready segment batches.

use serde::Serialize;

use crate::bucket::{ramp_color, Color, ColorScheme};
use crate::contour::{BandedStrip, Contour};
use crate::error::Result;
use crate::geo::Position;

/// Default vertical separation between successive contour rings, in meters.
pub const DEFAULT_LAYER_OFFSET: f64 = 8.0;

/// Opacity of contour ring colors.
pub const RING_ALPHA: f32 = 0.95;

/// A polyline with one color, ready for a renderer.
///
/// Batches always hold at least two positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentBatch {
    /// Color bucket (strips) or level index (rings).
    pub band: usize,
    pub color: Color,
    /// Whether the last position repeats the first.
    pub closed: bool,
    pub positions: Vec<Position>,
}

/// Consumer of segment batches, e.g. a 3-D globe or a file writer.
pub trait Renderer {
    fn render(&mut self, batch: &SegmentBatch) -> Result<()>;
}

/// Collects batches in memory.
impl Renderer for Vec<SegmentBatch> {
    fn render(&mut self, batch: &SegmentBatch) -> Result<()> {
        self.push(batch.clone());
        Ok(())
    }
}

/// Hand every batch to `renderer`, stopping at the first error.
///
/// Returns the number of batches rendered.
pub fn emit_all<R: Renderer + ?Sized>(batches: &[SegmentBatch], renderer: &mut R) -> Result<usize> {
    for batch in batches {
        renderer.render(batch)?;
    }
    Ok(batches.len())
}

/// One closed batch per contour.
///
/// Ring `i` is raised by `i × layer_offset` so stacked levels stay apart,
/// and colored along the hue ramp by `level / top level`.
pub fn ring_batches(contours: &[Contour], layer_offset: f64) -> Vec<SegmentBatch> {
    let top = contours.last().map(|c| c.level).unwrap_or(0.0);

    contours
        .iter()
        .enumerate()
        .filter(|(_, c)| c.ring.len() >= 2)
        .map(|(index, contour)| {
            let t = if top > 0.0 { contour.level / top } else { 0.0 };
            let lift = index as f64 * layer_offset;
            SegmentBatch {
                band: index,
                color: ramp_color(t, RING_ALPHA),
                closed: true,
                positions: contour
                    .ring
                    .iter()
                    .map(|p| Position::from(*p).raised(lift))
                    .collect(),
            }
        })
        .collect()
}

/// One open batch per non-empty bucket per strip.
pub fn strip_batches(strips: &[BandedStrip], scheme: &ColorScheme) -> Vec<SegmentBatch> {
    strips
        .iter()
        .flat_map(|strip| {
            strip
                .bands
                .iter()
                .enumerate()
                .filter(|(_, positions)| positions.len() >= 2)
                .map(|(band, positions)| SegmentBatch {
                    band,
                    color: scheme.color(band),
                    closed: false,
                    positions: positions.clone(),
                })
        })
        .collect()
}
