//! Phase API handlers.
//!
//! Fixture generation, bracket seeding and advancement, matchday listing and the phase
//! table.
//!
//! # Examples
//!
//! Generate a double round robin played on Saturdays:
//! ```bash
//! curl -X POST http://localhost:6970/api/v1/phases/1/fixture \
//!   -H "Content-Type: application/json" \
//!   -d '{"isLocalAway": true, "startDate": "2025-03-01", "weekDay": 6}'
//! ```
//!
//! Advance a knockout phase:
//! ```bash
//! curl -X POST http://localhost:6970/api/v1/phases/2/advance
//! ```

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Weekday};
use serde::Deserialize;
use sports_tournament::{
    AdvanceOutcome,
    bracket::BracketState,
    fixture::FixtureOptions,
    tournament::{MatchdayView, PhaseId, Registration, StandingsScope},
};
use std::time::Instant;

use super::AppState;
use super::errors::{ApiError, reject, unprocessable};
use super::request_id::RequestId;
use crate::logging::log_operation;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateFixtureRequest {
    /// Play every pairing home and away
    pub is_local_away: bool,
    pub start_date: Option<NaiveDate>,
    /// 0 = Sunday ... 6 = Saturday
    pub week_day: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBracketRequest {
    pub start_date: Option<NaiveDate>,
}

/// Weekday from its 0 = Sunday index
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Generate the round-robin fixture of a league or group phase.
///
/// Replaces any fixture the phase already has.
///
/// # Response
///
/// Returns `201 Created` with the matchdays and their matches.
///
/// # Errors
///
/// - `404 Not Found`: Phase doesn't exist
/// - `409 Conflict`: Phase is not played as a round robin
/// - `422 Unprocessable Entity`: Fewer than two registered teams, or invalid `weekDay`
pub async fn generate_fixture(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
    Json(request): Json<GenerateFixtureRequest>,
) -> Result<(StatusCode, Json<Vec<MatchdayView>>), ApiError> {
    let started = Instant::now();

    let weekday = match request.week_day {
        Some(index) => Some(weekday_from_index(index).ok_or_else(|| {
            unprocessable("weekDay must be between 0 (Sunday) and 6 (Saturday)")
        })?),
        None => None,
    };
    let options = FixtureOptions {
        double_round: request.is_local_away,
        start_date: request.start_date,
        weekday,
        ..FixtureOptions::default()
    };

    let matchdays = state
        .orchestrator
        .generate_fixture(phase_id, &options)
        .await
        .map_err(|e| reject(request_id.as_str(), "generate_fixture", phase_id, e))?;

    log_operation(
        request_id.as_str(),
        "generate_fixture",
        phase_id,
        started.elapsed().as_millis() as u64,
    );
    Ok((StatusCode::CREATED, Json(matchdays)))
}

/// Seed round 1 of a knockout or final phase.
///
/// # Response
///
/// Returns `201 Created` with the first round.
///
/// # Errors
///
/// - `404 Not Found`: Phase doesn't exist
/// - `409 Conflict`: Phase is not played as a bracket
/// - `422 Unprocessable Entity`: Fewer than two registered teams
pub async fn create_bracket(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
    Json(request): Json<CreateBracketRequest>,
) -> Result<(StatusCode, Json<MatchdayView>), ApiError> {
    let started = Instant::now();

    let round = state
        .orchestrator
        .create_bracket(phase_id, request.start_date)
        .await
        .map_err(|e| reject(request_id.as_str(), "create_bracket", phase_id, e))?;

    log_operation(
        request_id.as_str(),
        "create_bracket",
        phase_id,
        started.elapsed().as_millis() as u64,
    );
    Ok((StatusCode::CREATED, Json(round)))
}

/// Current state of a knockout phase.
pub async fn bracket_state(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
) -> Result<Json<BracketState>, ApiError> {
    state
        .orchestrator
        .bracket_state(phase_id)
        .await
        .map(Json)
        .map_err(|e| reject(request_id.as_str(), "bracket_state", phase_id, e))
}

/// Close the current knockout round.
///
/// # Response
///
/// ```json
/// {"outcome": "next_round", "data": {"matchday": {...}, "matches": [...]}}
/// {"outcome": "champion", "data": 7}
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Round not complete, bracket not seeded, already completed, or the
///   phase is not a bracket
pub async fn advance(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
) -> Result<Json<AdvanceOutcome>, ApiError> {
    let started = Instant::now();

    let outcome = state
        .orchestrator
        .advance(phase_id)
        .await
        .map_err(|e| reject(request_id.as_str(), "advance", phase_id, e))?;

    log_operation(
        request_id.as_str(),
        "advance",
        phase_id,
        started.elapsed().as_millis() as u64,
    );
    Ok(Json(outcome))
}

/// Matchdays of a phase with their matches, in round order.
pub async fn matchdays(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
) -> Result<Json<Vec<MatchdayView>>, ApiError> {
    state
        .orchestrator
        .matchdays(phase_id)
        .await
        .map(Json)
        .map_err(|e| reject(request_id.as_str(), "matchdays", phase_id, e))
}

/// Table of a phase in rank order.
pub async fn standings(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    state
        .orchestrator
        .standings(StandingsScope::Phase(phase_id))
        .await
        .map(Json)
        .map_err(|e| reject(request_id.as_str(), "standings", phase_id, e))
}

/// Rebuild the phase table from its matches.
///
/// Repairs a table left behind when a result was stored but a later write failed.
pub async fn recompute(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let started = Instant::now();

    let table = state
        .orchestrator
        .recompute_standings(StandingsScope::Phase(phase_id))
        .await
        .map_err(|e| reject(request_id.as_str(), "recompute_phase", phase_id, e))?;

    log_operation(
        request_id.as_str(),
        "recompute_phase",
        phase_id,
        started.elapsed().as_millis() as u64,
    );
    Ok(Json(table))
}

/// Zero the phase table and clear the results of its matches.
///
/// # Response
///
/// Returns `204 No Content`.
pub async fn reset(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(phase_id): Path<PhaseId>,
) -> Result<StatusCode, ApiError> {
    let started = Instant::now();

    state
        .orchestrator
        .reset_stats(StandingsScope::Phase(phase_id))
        .await
        .map_err(|e| reject(request_id.as_str(), "reset_phase", phase_id, e))?;

    log_operation(
        request_id.as_str(),
        "reset_phase",
        phase_id,
        started.elapsed().as_millis() as u64,
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_index_starts_on_sunday() {
        assert_eq!(weekday_from_index(0), Some(Weekday::Sun));
        assert_eq!(weekday_from_index(6), Some(Weekday::Sat));
        assert_eq!(weekday_from_index(7), None);
    }

    #[test]
    fn test_fixture_request_defaults() {
        let request: GenerateFixtureRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.is_local_away);
        assert!(request.start_date.is_none());

        let request: GenerateFixtureRequest =
            serde_json::from_str(r#"{"isLocalAway": true, "startDate": "2025-03-01", "weekDay": 6}"#)
                .unwrap();
        assert!(request.is_local_away);
        assert_eq!(request.week_day, Some(6));
    }
}
