//! Integration tests for the HTTP API.

use std::path::Path;
use std::sync::Arc;

use axum_test::TestServer;
use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;
use topoline::addressing::tiles_covering;
use topoline::decode::encode_elevation;
use topoline::fetch::LocalFetcher;
use topoline::{BoundingBox, TileKey, TileSource, TopoConfig, TopoService};
use topoline_service::{router, AppState};

const CONTOUR_QUERY: &str = "min_lon=103.80&min_lat=-3.81&max_lon=103.85&max_lat=-3.76";

/// Write a tile that slopes up towards the north, 100 m to about 350 m
/// across the test area. Every pixel carries data.
fn create_test_tile(root: &Path, key: TileKey) {
    let dir = root.join(key.zoom.to_string()).join(key.x.to_string());
    std::fs::create_dir_all(&dir).unwrap();

    let image = RgbaImage::from_fn(256, 256, |_, py| {
        let row_from_south = (8365 - key.y) * 256 + (255 - py);
        let [r, g, b] = encode_elevation(100.0 + row_from_south as f64 * 0.33);
        Rgba([r, g, b, 255])
    });
    image.save(dir.join(format!("{}.png", key.y))).unwrap();
}

fn create_test_tiles() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let bbox = BoundingBox::new(103.80, -3.81, 103.85, -3.76).unwrap();
    for key in tiles_covering(&bbox, 14).unwrap() {
        create_test_tile(temp_dir.path(), key);
    }
    temp_dir
}

/// Create a test server over a local tile directory.
fn create_test_server(temp_dir: &TempDir) -> TestServer {
    let mut config = TopoConfig::default();
    config.sampling.spacing_m = 50.0;
    config.stripe.spacing_m = 50.0;
    config.ring.interval = 25.0;
    config.ring.stride = 4;

    let source = TileSource::Local(LocalFetcher::new(temp_dir.path()));
    let topo_service = TopoService::new(source, config).unwrap();
    let state = Arc::new(AppState { topo_service });

    TestServer::new(router(state)).unwrap()
}

#[tokio::test]
async fn test_elevation_endpoint_success() {
    let temp_dir = create_test_tiles();
    let server = create_test_server(&temp_dir);

    let response = server.get("/elevation?lon=103.825&lat=-3.785").await;

    response.assert_status_ok();
    let json: Value = response.json();
    let elevation = json["elevation"].as_f64().unwrap();
    assert!((100.0..400.0).contains(&elevation));
    assert_eq!(json["lon"], 103.825);
    assert_eq!(json["lat"], -3.785);
    assert_eq!(json["tile"], "14/12917/8364");
}

#[tokio::test]
async fn test_elevation_endpoint_no_data_is_null() {
    let temp_dir = TempDir::new().unwrap();
    let key = TileKey::new(14, 12916, 8365);
    let dir = temp_dir.path().join("14").join("12916");
    std::fs::create_dir_all(&dir).unwrap();
    RgbaImage::from_pixel(256, 256, Rgba([0, 0, 0, 255]))
        .save(dir.join(format!("{}.png", key.y)))
        .unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/elevation?lon=103.80&lat=-3.81").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert!(json["elevation"].is_null());
}

#[tokio::test]
async fn test_elevation_endpoint_invalid_coordinates() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/elevation?lon=0&lat=86").await;

    response.assert_status_bad_request();
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("Latitude"));
}

#[tokio::test]
async fn test_elevation_endpoint_missing_tile() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/elevation?lon=103.825&lat=-3.785").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_elevation_endpoint_missing_params() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/elevation?lon=103.825").await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_contours_stripe() {
    let temp_dir = create_test_tiles();
    let server = create_test_server(&temp_dir);

    let response = server.get(&format!("/contours?{}", CONTOUR_QUERY)).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["strategy"], "stripe");
    assert_eq!(json["tiles_used"], 9);
    assert!(json["points_sampled"].as_u64().unwrap() > 0);
    assert!(json["strips"]["emitted"].as_u64().unwrap() > 0);

    let batches = json["batches"].as_array().unwrap();
    assert!(!batches.is_empty());
    for batch in batches {
        assert_eq!(batch["closed"], false);
        assert!(batch["positions"].as_array().unwrap().len() >= 2);
        assert_eq!(batch["color"].as_str().unwrap().len(), 9);
    }
}

#[tokio::test]
async fn test_contours_ring() {
    let temp_dir = create_test_tiles();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/contours?{}&strategy=ring", CONTOUR_QUERY))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["strategy"], "ring");
    assert!(json["strips"].is_null());

    let count = json["contour_count"].as_u64().unwrap();
    assert!(count > 0);
    let batches = json["batches"].as_array().unwrap();
    assert_eq!(batches.len() as u64, count);
    for batch in batches {
        assert_eq!(batch["closed"], true);
        let positions = batch["positions"].as_array().unwrap();
        assert_eq!(positions.first(), positions.last());
    }
}

#[tokio::test]
async fn test_contours_geojson() {
    let temp_dir = create_test_tiles();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/contours/geojson?{}", CONTOUR_QUERY))
        .await;

    response.assert_status_ok();
    let json: Value = serde_json::from_str(&response.text()).unwrap();
    assert_eq!(json["type"], "FeatureCollection");

    let features = json["features"].as_array().unwrap();
    assert!(!features.is_empty());
    let feature = &features[0];
    assert_eq!(feature["geometry"]["type"], "LineString");
    assert_eq!(
        feature["geometry"]["coordinates"][0]
            .as_array()
            .unwrap()
            .len(),
        3
    );
    assert!(feature["properties"]["band"].is_u64());
}

#[tokio::test]
async fn test_contours_invalid_bbox() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get("/contours?min_lon=103.85&min_lat=-3.81&max_lon=103.80&max_lat=-3.76")
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_contours_unknown_strategy() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/contours?{}&strategy=marching", CONTOUR_QUERY))
        .await;

    response.assert_status_bad_request();
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("marching"));
}

#[tokio::test]
async fn test_contours_too_many_tiles() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get("/contours?min_lon=100&min_lat=-5&max_lon=105&max_lat=0")
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_contours_without_tiles_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get(&format!("/contours?{}", CONTOUR_QUERY)).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["tiles_failed"], 9);
    assert!(json["batches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_stats_endpoint() {
    let temp_dir = create_test_tiles();
    let server = create_test_server(&temp_dir);

    // Initial stats
    let response = server.get("/stats").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["cache_hits"], 0);
    assert_eq!(json["cache_misses"], 0);
    assert_eq!(json["cache_capacity"], 256);

    // Two queries in the same tile
    server.get("/elevation?lon=103.825&lat=-3.785").await;
    server.get("/elevation?lon=103.8251&lat=-3.7851").await;

    let response = server.get("/stats").await;
    let json: Value = response.json();
    assert_eq!(json["cache_misses"], 1);
    assert_eq!(json["cache_hits"], 1);
    assert_eq!(json["tile_fetches"], 1);
}
