//! Example running the stripe pipeline over generated tiles, no data needed.
//!
//! Run with: cargo run --example synthetic

use topoline::decode::encode_elevation;
use topoline::emit::Renderer;
use topoline::{
    BoundingBox, Result, SegmentBatch, Strategy, TileFetcher, TileKey, TileRaster,
    TopoServiceBuilder,
};

/// Tiles holding a sine-shaped ridge that runs east-west.
struct RidgeFetcher;

impl TileFetcher for RidgeFetcher {
    async fn fetch(&self, key: TileKey) -> Result<TileRaster> {
        TileRaster::from_fn(256, |_, py| {
            let row = (key.y * 256 + py) as f64;
            encode_elevation(200.0 + 150.0 * (row / 90.0).sin())
        })
    }
}

/// Prints one line per batch instead of drawing it.
struct PrintRenderer;

impl Renderer for PrintRenderer {
    fn render(&mut self, batch: &SegmentBatch) -> Result<()> {
        let first = &batch.positions[0];
        println!(
            "band {} {} {:>4} positions from ({:.5}, {:.5}, {:.1}m)",
            batch.band,
            batch.color.to_hex(),
            batch.positions.len(),
            first.lon,
            first.lat,
            first.height
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let service = TopoServiceBuilder::new()
        .spacing_m(250.0)
        .build_with(RidgeFetcher)?;

    let bbox = BoundingBox::new(103.80, -3.81, 103.85, -3.76)?;
    let output = service
        .render(&bbox, Strategy::Stripe, &mut PrintRenderer)
        .await?;

    if let Some(stats) = output.strip_stats {
        println!(
            "\n{} strips: {} emitted, {} too flat, {} mostly invalid",
            stats.total, stats.emitted, stats.too_flat, stats.mostly_invalid
        );
    }
    Ok(())
}
