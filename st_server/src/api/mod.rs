//! HTTP API for the tournament server.
//!
//! # Modules
//!
//! - [`phases`]: Fixture generation, brackets, matchdays and phase tables
//! - [`matches`]: Result entry
//! - [`tournaments`]: Tournament-wide tables
//! - [`errors`]: Engine error to HTTP status mapping
//! - [`request_id`]: Request correlation IDs
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                              - Health check
//! POST /api/v1/phases/{id}/fixture          - Generate round-robin fixture
//! POST /api/v1/phases/{id}/bracket          - Seed knockout bracket
//! GET  /api/v1/phases/{id}/bracket          - Knockout state
//! POST /api/v1/phases/{id}/advance          - Advance knockout round
//! GET  /api/v1/phases/{id}/matchdays        - Matchdays with matches
//! GET  /api/v1/phases/{id}/standings        - Phase table
//! POST /api/v1/phases/{id}/standings/recompute - Rebuild phase table
//! POST /api/v1/phases/{id}/reset            - Reset phase stats
//! GET  /api/v1/tournaments/{id}/standings   - Tournament table
//! POST /api/v1/tournaments/{id}/standings/recompute - Rebuild tournament table
//! POST /api/v1/tournaments/{id}/reset       - Reset tournament stats
//! PUT  /api/v1/matches/{id}/result          - Enter a match result
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod errors;
pub mod matches;
pub mod phases;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde_json::json;
use sports_tournament::PhaseOrchestrator;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PhaseOrchestrator>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// use sports_tournament::{InMemoryRepository, PhaseOrchestrator};
/// use st_server::api::{AppState, create_router};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = PhaseOrchestrator::with_defaults(Arc::new(InMemoryRepository::new()));
/// let app = create_router(AppState {
///     orchestrator: Arc::new(orchestrator),
/// });
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:6970").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    let phase_routes = Router::new()
        .route("/phases/{phase_id}/fixture", post(phases::generate_fixture))
        .route(
            "/phases/{phase_id}/bracket",
            post(phases::create_bracket).get(phases::bracket_state),
        )
        .route("/phases/{phase_id}/advance", post(phases::advance))
        .route("/phases/{phase_id}/matchdays", get(phases::matchdays))
        .route("/phases/{phase_id}/standings", get(phases::standings))
        .route(
            "/phases/{phase_id}/standings/recompute",
            post(phases::recompute),
        )
        .route("/phases/{phase_id}/reset", post(phases::reset));

    let tournament_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/standings",
            get(tournaments::standings),
        )
        .route(
            "/tournaments/{tournament_id}/standings/recompute",
            post(tournaments::recompute),
        )
        .route("/tournaments/{tournament_id}/reset", post(tournaments::reset));

    let match_routes =
        Router::new().route("/matches/{match_id}/result", put(matches::submit_result));

    Router::new()
        .merge(phase_routes)
        .merge(tournament_routes)
        .merge(match_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Response
///
/// Returns `200 OK` if storage is reachable, or `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6970/health
/// # {"status":"healthy","version":"0.1.0","storage":true,"timestamp":"2025-11-22T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = state.orchestrator.repository().health_check().await.is_ok();

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
