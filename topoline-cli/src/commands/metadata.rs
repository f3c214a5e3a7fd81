use anyhow::{Context, Result};
use serde::Serialize;
use topoline::fetch::TileMetadata;

#[derive(Serialize)]
struct MetadataResponse<'a> {
    root: &'a str,
    tile_url_template: &'a str,
    /// West, south, east, north.
    bounds: [f64; 4],
    min_zoom: u8,
    max_zoom: u8,
}

pub async fn run(root: &str, timeout_secs: u64, json: bool) -> Result<()> {
    let meta = TileMetadata::resolve(root, timeout_secs)
        .await
        .with_context(|| format!("Failed to resolve tile service at {}", root))?;

    let response = MetadataResponse {
        root,
        tile_url_template: &meta.tile_url_template,
        bounds: [
            meta.bounds.min_lon(),
            meta.bounds.min_lat(),
            meta.bounds.max_lon(),
            meta.bounds.max_lat(),
        ],
        min_zoom: meta.min_zoom,
        max_zoom: meta.max_zoom,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Tile Service");
    println!("============");
    println!("Root:        {}", response.root);
    println!("Tiles:       {}", response.tile_url_template);
    println!(
        "Bounds:      {}, {} to {}, {}",
        response.bounds[0], response.bounds[1], response.bounds[2], response.bounds[3]
    );
    println!("Zoom:        {} to {}", response.min_zoom, response.max_zoom);
    println!();
    println!("Use with: topoline --tile-url '{}' ...", response.tile_url_template);

    Ok(())
}
