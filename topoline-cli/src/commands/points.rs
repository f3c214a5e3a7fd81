use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use topoline::{BoundingBox, GeoPoint};

use super::SourceArgs;

pub async fn run(
    source: &SourceArgs,
    bbox: &str,
    output: Option<PathBuf>,
    grid: bool,
) -> Result<()> {
    let bbox = BoundingBox::parse(bbox).context("Invalid bounding box")?;
    let service = source.build()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(if grid {
        "sampling every pixel"
    } else {
        "sampling"
    });
    pb.enable_steady_tick(Duration::from_millis(100));

    let samples = if grid {
        service.sample_points(&bbox).await
    } else {
        service.sample_steps(&bbox).await
    }
    .context("Failed to sample elevation")?;

    pb.finish_with_message(format!(
        "{} points from {} tiles ({} failed, {} samples rejected)",
        samples.points.len(),
        samples.stats.tiles_used,
        samples.stats.tiles_failed,
        samples.stats.samples_rejected
    ));

    match output {
        Some(path) => {
            let file = File::create(&path).context("Failed to create output file")?;
            write_points(BufWriter::new(file), &samples.points)?;
            println!("Output written to: {}", path.display());
        }
        None => write_points(io::stdout().lock(), &samples.points)?,
    }

    Ok(())
}

/// Write points as `lon,lat,height` CSV rows.
fn write_points<W: Write>(writer: W, points: &[GeoPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["lon", "lat", "height"])?;
    for point in points {
        writer.write_record([
            format!("{:.7}", point.lon),
            format!("{:.7}", point.lat),
            format!("{:.1}", point.height),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_points_csv() {
        let points = vec![
            GeoPoint::new(103.8, -3.81, 120.04),
            GeoPoint::new(103.80045, -3.81, 131.5),
        ];
        let mut out = Vec::new();
        write_points(&mut out, &points).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "lon,lat,height");
        assert_eq!(lines[1], "103.8000000,-3.8100000,120.0");
        assert_eq!(lines[2], "103.8004500,-3.8100000,131.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_no_points_keeps_header() {
        let mut out = Vec::new();
        write_points(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "lon,lat,height\n");
    }
}
