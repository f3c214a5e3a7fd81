//! Topoline Service - HTTP microservice for terrain-RGB elevation and contours.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TOPOLINE_TILE_DIR` | Directory of `{z}/{x}/{y}.png` tiles | Current directory |
//! | `TOPOLINE_TILE_URL` | Tile URL template with `{z}`, `{x}`, `{y}` | None |
//! | `TOPOLINE_ZOOM` | Sampling zoom level | 14 |
//! | `TOPOLINE_CACHE_SIZE` | Maximum tiles in cache | 256 |
//! | `TOPOLINE_SPACING_M` | Step and strip spacing in meters | 5 |
//! | `TOPOLINE_CONTOUR_INTERVAL` | Contour interval in meters | 10 |
//! | `TOPOLINE_TIMEOUT_SECS` | HTTP tile request timeout | 30 |
//! | `TOPOLINE_PORT` | HTTP server port | 8080 |
//! | `TOPOLINE_PRELOAD` | `min_lon,min_lat,max_lon,max_lat` boxes separated by `;` | None |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /elevation?lon=X&lat=Y` - Elevation at a coordinate
//! - `GET /contours?min_lon&min_lat&max_lon&max_lat&strategy` - Segment batches
//! - `GET /contours/geojson?...` - Segment batches as GeoJSON
//! - `GET /health` - Health check
//! - `GET /stats` - Cache statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use topoline::{BoundingBox, TopoServiceBuilder};
use topoline_service::{handlers, router, AppState};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation for the topoline service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Topoline Terrain Service",
        version = "0.1.0",
        description = "REST API for terrain-RGB elevation queries and contour vectorization.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_elevation,
        handlers::get_contours,
        handlers::get_contours_geojson,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::ElevationQuery,
            handlers::ElevationResponse,
            handlers::ContourQuery,
            handlers::ContourResponse,
            handlers::BatchBody,
            handlers::StripSummary,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "elevation", description = "Elevation query endpoints"),
        (name = "contours", description = "Contour and strip vectorization"),
        (name = "system", description = "System and health endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topoline_service=info,topoline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load port from environment (service-specific config)
    let port: u16 = std::env::var("TOPOLINE_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // The library handles the tile source, zoom, cache and pipeline variables
    let builder = match TopoServiceBuilder::from_env() {
        Ok(builder) => builder,
        Err(_) => {
            tracing::warn!("No tile source configured, using current directory");
            TopoServiceBuilder::new().tile_dir(".")
        }
    };
    let topo_service = builder.build()?;

    tracing::info!(
        source = %topo_service.cache().fetcher().describe(),
        zoom = topo_service.config().sampling.zoom,
        cache_capacity = topo_service.cache_capacity(),
        port = port,
        "Starting topoline service"
    );

    if let Ok(preload_val) = std::env::var("TOPOLINE_PRELOAD") {
        for bbox in parse_preload_bounds(&preload_val) {
            match topo_service.preload(&bbox).await {
                Ok(stats) => tracing::info!(
                    tiles_loaded = stats.tiles_loaded,
                    tiles_already_cached = stats.tiles_already_cached,
                    tiles_failed = stats.tiles_failed,
                    tiles_matched = stats.tiles_matched,
                    elapsed_ms = stats.elapsed_ms,
                    "Preload complete"
                ),
                Err(e) => tracing::warn!(error = %e, "Preload skipped"),
            }
        }
    }

    let state = Arc::new(AppState { topo_service });

    let app = router(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse the `TOPOLINE_PRELOAD` value into bounding boxes.
///
/// Boxes are `min_lon,min_lat,max_lon,max_lat`, separated by `;`. Malformed
/// boxes are logged and skipped.
fn parse_preload_bounds(value: &str) -> Vec<BoundingBox> {
    value
        .split(';')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|bbox_str| match BoundingBox::parse(bbox_str) {
            Ok(bbox) => Some(bbox),
            Err(e) => {
                tracing::warn!(bbox = bbox_str, error = %e, "Invalid preload bounding box");
                None
            }
        })
        .collect()
}
