use anyhow::{Context, Result};
use geojson::GeoJson;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use topoline::geojson::batches_to_feature_collection;
use topoline::{BoundingBox, ContourOutput, Strategy};

use super::SourceArgs;

pub async fn run(
    source: &SourceArgs,
    bbox: &str,
    strategy: Strategy,
    interval: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let bbox = BoundingBox::parse(bbox).context("Invalid bounding box")?;

    let mut builder = source.builder()?;
    if let Some(interval) = interval {
        builder = builder.contour_interval(interval);
    }
    let service = builder.build().context("Failed to create topoline service")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(format!("building {} contours", strategy));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = service
        .contours(&bbox, strategy)
        .await
        .context("Failed to build contours")?;

    pb.finish_with_message(summary(&result));

    let geojson = GeoJson::from(batches_to_feature_collection(&result.batches));
    match output {
        Some(path) => {
            let file = File::create(&path).context("Failed to create output file")?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &geojson)?;
            writer.flush()?;
            println!("Output written to: {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer(&mut stdout, &geojson)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}

fn summary(output: &ContourOutput) -> String {
    let detail = match &output.strip_stats {
        Some(strips) => format!(
            "{} of {} strips kept ({} sparse, {} invalid, {} flat)",
            strips.emitted,
            strips.total,
            strips.too_few_points,
            strips.mostly_invalid,
            strips.too_flat
        ),
        None => format!("{} contour levels", output.contour_count),
    };
    format!(
        "{} batches, {} from {} samples in {}ms",
        output.batches.len(),
        detail,
        output.points_sampled,
        output.elapsed_ms
    )
}
