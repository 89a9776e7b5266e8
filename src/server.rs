//! HTTP surface of the simulation view: axum router and request handlers.
//!
//! The driver runs as a background task on the same tokio runtime. The
//! handlers only read from it: the styled SVG, the driver status, and the
//! last applied color of every segment.
//!
//! ## Rust concepts
//! - axum extractors: `State`
//! - `Arc` for sharing the driver across async tasks
//! - `impl IntoResponse` tuples for custom headers
//! - `tower-http` middleware for CORS and request tracing

use crate::driver::{DriverState, DriverStatus, PassReport, PollingDriver, SegmentView};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, passed to every handler via axum's `State` extractor.
///
/// Rust concept: CLONE for Arc
/// axum clones the state for each request, so it only holds an `Arc` to
/// the driver. All the interesting data sits behind the driver's locks.
#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<PollingDriver>,
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(get_simulation_svg, get_status, get_segments),
    components(schemas(DriverStatus, DriverState, PassReport, SegmentView)),
    tags(
        (name = "view", description = "Rendered schematic"),
        (name = "system", description = "Driver status endpoints"),
    ),
    info(
        title = "RGB Clock Simulation API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Live SVG simulation of a seven-segment RGB LED clock"
    )
)]
pub struct ApiDoc;

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).validator_url("none")),
        )
        .route("/simulation.svg", get(get_simulation_svg))
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/segments", get(get_segments))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET /simulation.svg — the schematic with the current segment styles
#[utoipa::path(
    get,
    path = "/simulation.svg",
    tag = "view",
    responses(
        (status = 200, description = "Styled SVG document", content_type = "image/svg+xml", body = String),
        (status = 503, description = "Artwork not loaded yet")
    )
)]
async fn get_simulation_svg(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let handle = state.driver.svg().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "SVG artwork not loaded yet".to_string(),
        )
    })?;

    let svg = handle
        .lock()
        .to_svg_string()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

/// GET /api/v1/status — driver lifecycle state and tick counters
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current driver status", body = DriverStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<DriverStatus> {
    Json(state.driver.status())
}

/// GET /api/v1/segments — last applied color of every segment
#[utoipa::path(
    get,
    path = "/api/v1/segments",
    tag = "system",
    responses(
        (status = 200, description = "Segments that have received a color, in digit-major order", body = Vec<SegmentView>)
    )
)]
async fn get_segments(State(state): State<AppState>) -> Json<Vec<SegmentView>> {
    Json(state.driver.segments())
}
