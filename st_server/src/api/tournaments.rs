//! Tournament-wide table handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sports_tournament::tournament::{Registration, StandingsScope, TournamentId};
use std::time::Instant;

use super::AppState;
use super::errors::{ApiError, reject};
use super::request_id::RequestId;
use crate::logging::log_operation;

/// Tournament table in rank order.
pub async fn standings(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    state
        .orchestrator
        .standings(StandingsScope::Tournament(tournament_id))
        .await
        .map(Json)
        .map_err(|e| reject(request_id.as_str(), "tournament_standings", tournament_id, e))
}

/// Rebuild the tournament table from every match of the tournament.
pub async fn recompute(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let started = Instant::now();

    let table = state
        .orchestrator
        .recompute_standings(StandingsScope::Tournament(tournament_id))
        .await
        .map_err(|e| reject(request_id.as_str(), "recompute_tournament", tournament_id, e))?;

    log_operation(
        request_id.as_str(),
        "recompute_tournament",
        tournament_id,
        started.elapsed().as_millis() as u64,
    );
    Ok(Json(table))
}

/// Zero every table of the tournament and clear the results of all its matches.
///
/// # Response
///
/// Returns `204 No Content`.
pub async fn reset(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();

    state
        .orchestrator
        .reset_stats(StandingsScope::Tournament(tournament_id))
        .await
        .map_err(|e| reject(request_id.as_str(), "reset_tournament", tournament_id, e))?;

    log_operation(
        request_id.as_str(),
        "reset_tournament",
        tournament_id,
        started.elapsed().as_millis() as u64,
    );
    Ok(StatusCode::NO_CONTENT)
}
