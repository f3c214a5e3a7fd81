//! Basic example demonstrating topoline library usage.
//!
//! Run with: cargo run --example basic -- /path/to/terrain-rgb

use std::env;

use topoline::{BoundingBox, Strategy, TopoError, TopoServiceBuilder};

#[tokio::main]
async fn main() -> Result<(), TopoError> {
    // Tile directory laid out as {z}/{x}/{y}.png
    let tile_dir = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/terrain-rgb");
        std::process::exit(1);
    });

    let service = TopoServiceBuilder::new()
        .tile_dir(&tile_dir)
        .cache_size(64)
        .build()?;

    let locations = [
        ("Lahat, South Sumatra", 103.825, -3.785),
        ("Mount Dempo", 103.1302, -4.0307),
    ];

    println!("Elevation queries:");
    println!("{:-<50}", "");

    for (name, lon, lat) in &locations {
        match service.elevation(*lon, *lat).await {
            Ok(Some(elevation)) => println!("{}: {:.1}m", name, elevation),
            Ok(None) => println!("{}: no data", name),
            Err(TopoError::TileNotFound { .. }) => {
                println!("{}: tile not available locally", name)
            }
            Err(e) => println!("{}: error - {}", name, e),
        }
    }

    let bbox = BoundingBox::new(103.80, -3.81, 103.85, -3.76)?;
    for strategy in [Strategy::Stripe, Strategy::Ring] {
        let output = service.contours(&bbox, strategy).await?;
        println!(
            "\n{}: {} batches from {} samples in {}ms",
            strategy,
            output.batches.len(),
            output.points_sampled,
            output.elapsed_ms
        );
    }

    // Show cache statistics
    let stats = service.cache_stats();
    println!("\nCache statistics:");
    println!("  Fetches: {}", stats.fetch_count);
    println!("  Hits: {}", stats.hit_count);
    println!("  Misses: {}", stats.miss_count);
    println!("  Hit rate: {:.1}%", stats.hit_rate() * 100.0);

    Ok(())
}
