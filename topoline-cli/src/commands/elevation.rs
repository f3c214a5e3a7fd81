use anyhow::{Context, Result};
use serde::Serialize;

use super::SourceArgs;

#[derive(Serialize)]
struct ElevationResponse {
    lon: f64,
    lat: f64,
    elevation: Option<f64>,
    tile: String,
}

pub async fn run(source: &SourceArgs, lon: f64, lat: f64, json: bool) -> Result<()> {
    let service = source.build()?;

    let tile = service
        .tile_position(lon, lat)
        .context("Failed to address coordinate")?
        .key
        .to_string();
    let elevation = service
        .elevation(lon, lat)
        .await
        .context("Failed to get elevation")?;

    if json {
        let response = ElevationResponse {
            lon,
            lat,
            elevation,
            tile,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        match elevation {
            Some(elev) => println!("{:.1}", elev),
            None => println!("no data"),
        }
    }

    Ok(())
}
