use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use topoline::fetch::DEFAULT_TIMEOUT_SECS;
use topoline::Strategy;

mod commands;

use commands::SourceArgs;

/// Terrain-RGB elevation and contour CLI tool
#[derive(Parser)]
#[command(name = "topoline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tile URL template with {z}, {x} and {y} placeholders
    #[arg(
        short = 'u',
        long,
        env = "TOPOLINE_TILE_URL",
        global = true,
        conflicts_with = "tile_dir"
    )]
    tile_url: Option<String>,

    /// Directory of tiles laid out as {z}/{x}/{y}.png
    #[arg(short = 'd', long, env = "TOPOLINE_TILE_DIR", global = true)]
    tile_dir: Option<PathBuf>,

    /// Zoom level to sample at
    #[arg(
        short,
        long,
        env = "TOPOLINE_ZOOM",
        default_value = "14",
        global = true
    )]
    zoom: u8,

    /// Maximum tiles in cache
    #[arg(
        short,
        long,
        env = "TOPOLINE_CACHE_SIZE",
        default_value = "256",
        global = true
    )]
    cache_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tile and pixel a coordinate falls on
    Tile {
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Query elevation for a single coordinate
    Elevation {
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Export sampled points inside a bounding box as CSV
    Points {
        /// Bounding box as min_lon,min_lat,max_lon,max_lat
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sample every tile pixel instead of stepping by the configured spacing
        #[arg(long)]
        grid: bool,
    },

    /// Vectorize a bounding box into contour lines and export GeoJSON
    Contours {
        /// Bounding box as min_lon,min_lat,max_lon,max_lat
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,

        /// Contour strategy: ring or stripe
        #[arg(short, long, default_value = "stripe")]
        strategy: Strategy,

        /// Contour interval in meters (ring strategy)
        #[arg(short, long, env = "TOPOLINE_CONTOUR_INTERVAL")]
        interval: Option<f64>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a tile service root (TileJSON) to its bounds and URL template
    Metadata {
        /// Tile service root URL
        root: String,

        /// Request timeout in seconds
        #[arg(long, env = "TOPOLINE_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let source = SourceArgs {
        tile_url: cli.tile_url,
        tile_dir: cli.tile_dir,
        zoom: cli.zoom,
        cache_size: cli.cache_size,
    };

    match cli.command {
        Commands::Tile { lon, lat, json } => commands::tile::run(&source, lon, lat, json),
        Commands::Elevation { lon, lat, json } => {
            commands::elevation::run(&source, lon, lat, json).await
        }
        Commands::Points { bbox, output, grid } => {
            commands::points::run(&source, &bbox, output, grid).await
        }
        Commands::Contours {
            bbox,
            strategy,
            interval,
            output,
        } => commands::contours::run(&source, &bbox, strategy, interval, output).await,
        Commands::Metadata {
            root,
            timeout,
            json,
        } => commands::metadata::run(&root, timeout, json).await,
    }
}
