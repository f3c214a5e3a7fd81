//! HTTP request handlers for the terrain service.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use topoline::addressing::tiles_covering;
use topoline::contour::StripStats;
use topoline::geojson::batches_to_feature_collection;
use topoline::{BoundingBox, ContourOutput, SegmentBatch, Strategy, TopoError};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Largest number of tiles a single contour request may cover.
pub const MAX_TILES_PER_REQUEST: usize = 64;

/// Query parameters for the elevation endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ElevationQuery {
    /// Longitude in decimal degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in decimal degrees (strictly within ±85.05).
    pub lat: f64,
}

/// Elevation response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ElevationResponse {
    /// Longitude queried.
    pub lon: f64,
    /// Latitude queried.
    pub lat: f64,
    /// Elevation in meters, `null` where the tile has no data.
    pub elevation: Option<f64>,
    /// Tile the coordinate falls on, as `z/x/y`.
    pub tile: String,
}

/// Query parameters for the contour endpoints.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ContourQuery {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    /// `stripe` (default) or `ring`.
    #[serde(default)]
    pub strategy: Option<String>,
}

/// One colored polyline.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchBody {
    /// Color bucket (stripe) or level index (ring).
    pub band: usize,
    /// Color as `#rrggbbaa`.
    pub color: String,
    /// Whether the last position repeats the first.
    pub closed: bool,
    /// `[lon, lat, height]` triples.
    pub positions: Vec<Vec<f64>>,
}

impl From<&SegmentBatch> for BatchBody {
    fn from(batch: &SegmentBatch) -> Self {
        Self {
            band: batch.band,
            color: batch.color.to_hex(),
            closed: batch.closed,
            positions: batch
                .positions
                .iter()
                .map(|p| vec![p.lon, p.lat, p.height])
                .collect(),
        }
    }
}

/// What happened to the strips of a stripe run.
#[derive(Debug, Serialize, ToSchema)]
pub struct StripSummary {
    pub total: usize,
    pub too_few_points: usize,
    pub mostly_invalid: usize,
    pub too_flat: usize,
    pub emitted: usize,
}

impl From<StripStats> for StripSummary {
    fn from(stats: StripStats) -> Self {
        Self {
            total: stats.total,
            too_few_points: stats.too_few_points,
            mostly_invalid: stats.mostly_invalid,
            too_flat: stats.too_flat,
            emitted: stats.emitted,
        }
    }
}

/// Contour response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContourResponse {
    /// Strategy used.
    pub strategy: String,
    /// Points (stripe) or grid cells (ring) fed to the builder.
    pub points_sampled: usize,
    /// Tiles read for this request.
    pub tiles_used: u64,
    /// Tiles that failed and were skipped.
    pub tiles_failed: u64,
    /// Contour levels kept (ring only).
    pub contour_count: usize,
    /// Strip outcomes (stripe only).
    pub strips: Option<StripSummary>,
    /// Processing time in milliseconds.
    pub elapsed_ms: u64,
    pub batches: Vec<BatchBody>,
}

impl From<ContourOutput> for ContourResponse {
    fn from(output: ContourOutput) -> Self {
        Self {
            strategy: output.strategy.to_string(),
            points_sampled: output.points_sampled,
            tiles_used: output.sample_stats.tiles_used,
            tiles_failed: output.sample_stats.tiles_failed,
            contour_count: output.contour_count,
            strips: output.strip_stats.map(StripSummary::from),
            elapsed_ms: output.elapsed_ms,
            batches: output.batches.iter().map(BatchBody::from).collect(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Cache statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of tiles in cache.
    pub cached_tiles: u64,
    /// Maximum number of tiles the cache holds.
    pub cache_capacity: u64,
    /// Cache hit count.
    pub cache_hits: u64,
    /// Cache miss count.
    pub cache_misses: u64,
    /// Fetches issued to the tile source.
    pub tile_fetches: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
}

/// HTTP status for a library error.
pub fn error_status(e: &TopoError) -> StatusCode {
    match e {
        TopoError::LatitudeOutOfRange { .. }
        | TopoError::LongitudeOutOfRange { .. }
        | TopoError::InvalidZoom { .. }
        | TopoError::InvalidBoundingBox { .. }
        | TopoError::InvalidConfig { .. }
        | TopoError::InvalidTileKey { .. } => StatusCode::BAD_REQUEST,
        TopoError::TileNotFound { .. } => StatusCode::NOT_FOUND,
        TopoError::FetchFailed { .. }
        | TopoError::DecodeFailed { .. }
        | TopoError::UnexpectedTileSize { .. }
        | TopoError::MetadataFailed { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// Create an error response from a library error.
fn error_response(e: TopoError) -> Response {
    let status = error_status(&e);
    tracing::warn!(status = status.as_u16(), error = %e, "Request failed");
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// Get elevation for given coordinates.
///
/// # Returns
///
/// - `200 OK` with the elevation (or `null` for no data)
/// - `400 Bad Request` if coordinates are invalid
/// - `404 Not Found` if the tile is not in the tile directory
/// - `502 Bad Gateway` if the tile could not be fetched or decoded
#[utoipa::path(
    get,
    path = "/elevation",
    params(ElevationQuery),
    responses(
        (status = 200, description = "Elevation at the coordinate", body = ElevationResponse),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 404, description = "Tile not available", body = ErrorResponse),
        (status = 502, description = "Tile source failure", body = ErrorResponse)
    ),
    tag = "elevation"
)]
pub async fn get_elevation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ElevationQuery>,
) -> Response {
    tracing::debug!(lon = query.lon, lat = query.lat, "Elevation query");

    let service = &state.topo_service;
    let position = match service.tile_position(query.lon, query.lat) {
        Ok(position) => position,
        Err(e) => return error_response(e),
    };

    match service.elevation(query.lon, query.lat).await {
        Ok(elevation) => (
            StatusCode::OK,
            Json(ElevationResponse {
                lon: query.lon,
                lat: query.lat,
                elevation,
                tile: position.key.to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// Validate a contour query into a box and strategy.
fn parse_contour_query(
    state: &AppState,
    query: &ContourQuery,
) -> Result<(BoundingBox, Strategy), TopoError> {
    let bbox = BoundingBox::new(query.min_lon, query.min_lat, query.max_lon, query.max_lat)?;
    let strategy = match &query.strategy {
        Some(s) => s.parse::<Strategy>()?,
        None => Strategy::default(),
    };

    let tiles = tiles_covering(&bbox, state.topo_service.config().sampling.zoom)?;
    if tiles.len() > MAX_TILES_PER_REQUEST {
        return Err(TopoError::InvalidConfig {
            reason: format!(
                "bounding box covers {} tiles (limit {})",
                tiles.len(),
                MAX_TILES_PER_REQUEST
            ),
        });
    }

    Ok((bbox, strategy))
}

/// Build contour or strip batches for a bounding box.
#[utoipa::path(
    get,
    path = "/contours",
    params(ContourQuery),
    responses(
        (status = 200, description = "Segment batches and statistics", body = ContourResponse),
        (status = 400, description = "Invalid bounding box or strategy", body = ErrorResponse)
    ),
    tag = "contours"
)]
pub async fn get_contours(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContourQuery>,
) -> Response {
    let (bbox, strategy) = match parse_contour_query(&state, &query) {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };

    match state.topo_service.contours(&bbox, strategy).await {
        Ok(output) => (StatusCode::OK, Json(ContourResponse::from(output))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Build contour or strip batches as a GeoJSON FeatureCollection.
#[utoipa::path(
    get,
    path = "/contours/geojson",
    params(ContourQuery),
    responses(
        (status = 200, description = "FeatureCollection of 3-D LineStrings", content_type = "application/geo+json"),
        (status = 400, description = "Invalid bounding box or strategy", body = ErrorResponse)
    ),
    tag = "contours"
)]
pub async fn get_contours_geojson(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContourQuery>,
) -> Response {
    let (bbox, strategy) = match parse_contour_query(&state, &query) {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };

    match state.topo_service.contours(&bbox, strategy).await {
        Ok(output) => {
            let geojson = GeoJson::from(batches_to_feature_collection(&output.batches));
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/geo+json")],
                geojson.to_string(),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get cache statistics.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Tile cache statistics", body = StatsResponse)),
    tag = "system"
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let service = &state.topo_service;
    let stats = service.cache_stats();

    Json(StatsResponse {
        cached_tiles: stats.entry_count,
        cache_capacity: service.cache_capacity(),
        cache_hits: stats.hit_count,
        cache_misses: stats.miss_count,
        tile_fetches: stats.fetch_count,
        hit_rate: stats.hit_rate(),
    })
}
