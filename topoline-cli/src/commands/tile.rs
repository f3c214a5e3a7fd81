use anyhow::{Context, Result};
use serde::Serialize;
use topoline::addressing::DEFAULT_TILE_SIZE;
use topoline::lon_lat_to_tile;

use super::SourceArgs;

#[derive(Serialize)]
struct TileResponse {
    lon: f64,
    lat: f64,
    tile: String,
    pixel_x: u32,
    pixel_y: u32,
    /// West, south, east, north.
    bounds: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

pub fn run(source: &SourceArgs, lon: f64, lat: f64, json: bool) -> Result<()> {
    let pos = lon_lat_to_tile(lon, lat, source.zoom, DEFAULT_TILE_SIZE)
        .context("Failed to address coordinate")?;
    let bounds = pos.key.bounds();

    // Only describe the source when one is configured
    let tile_source = source
        .builder()
        .ok()
        .and_then(|builder| builder.source().ok())
        .map(|s| s.describe());

    let response = TileResponse {
        lon,
        lat,
        tile: pos.key.to_string(),
        pixel_x: pos.pixel_x,
        pixel_y: pos.pixel_y,
        bounds: [
            bounds.min_lon(),
            bounds.min_lat(),
            bounds.max_lon(),
            bounds.max_lat(),
        ],
        source: tile_source,
    };

    if json {
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    println!("Tile Information");
    println!("================");
    println!("Coordinate:  {:.6}, {:.6}", lon, lat);
    println!("Tile:        {}", response.tile);
    println!("Pixel:       ({}, {})", response.pixel_x, response.pixel_y);
    println!(
        "Bounds:      {:.6}, {:.6} to {:.6}, {:.6}",
        response.bounds[0], response.bounds[1], response.bounds[2], response.bounds[3]
    );
    if let Some(source) = &response.source {
        println!("Source:      {}", source);
    }

    Ok(())
}
