//! Topoline Service Library
//!
//! HTTP handlers, router and types for the terrain service.
//! This library is used by both the topoline-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use topoline::{TileSource, TopoService};

/// Application state shared across handlers.
pub struct AppState {
    /// Terrain session used for every request.
    pub topo_service: TopoService<TileSource>,
}

/// API routes without documentation or middleware layers.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/elevation", get(handlers::get_elevation))
        .route("/contours", get(handlers::get_contours))
        .route("/contours/geojson", get(handlers::get_contours_geojson))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    BatchBody, ContourQuery, ContourResponse, ElevationQuery, ElevationResponse, ErrorResponse,
    HealthResponse, StatsResponse,
};
