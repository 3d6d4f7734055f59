//! Match API handlers.
//!
//! # Examples
//!
//! Enter a result with a booking:
//! ```bash
//! curl -X PUT http://localhost:6970/api/v1/matches/12/result \
//!   -H "Content-Type: application/json" \
//!   -d '{"homeScore": 2, "awayScore": 1, "events": [{"kind": "yellow_card", "minute": 40, "side": "team_b"}]}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use sports_tournament::{
    SubmissionOutcome,
    tournament::{MatchEvent, MatchId, MatchResult, ResultSubmission},
};
use std::time::Instant;

use super::AppState;
use super::errors::{ApiError, reject};
use super::request_id::RequestId;
use crate::logging::log_operation;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitResultRequest {
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Winner over a level score, e.g. after penalties
    pub outcome: Option<MatchResult>,
    pub events: Option<Vec<MatchEvent>>,
}

impl From<SubmitResultRequest> for ResultSubmission {
    fn from(request: SubmitResultRequest) -> Self {
        ResultSubmission {
            home_score: request.home_score,
            away_score: request.away_score,
            outcome: request.outcome,
            events: request.events,
        }
    }
}

/// Enter the result of a match.
///
/// # Response
///
/// Returns `200 OK` with the stored match, whether its round is complete, the champion if
/// this result decided a final, and the recomputed phase table.
///
/// # Errors
///
/// - `404 Not Found`: Match doesn't exist
/// - `422 Unprocessable Entity`: Draw in a knockout match, outcome contradicting the score,
///   result for a bye or for an already advanced round
pub async fn submit_result(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(match_id): Path<MatchId>,
    Json(request): Json<SubmitResultRequest>,
) -> Result<Json<SubmissionOutcome>, ApiError> {
    let started = Instant::now();

    let outcome = state
        .orchestrator
        .submit_result(match_id, request.into())
        .await
        .map_err(|e| reject(request_id.as_str(), "submit_result", match_id, e))?;

    log_operation(
        request_id.as_str(),
        "submit_result",
        match_id,
        started.elapsed().as_millis() as u64,
    );
    Ok(Json(outcome))
}
