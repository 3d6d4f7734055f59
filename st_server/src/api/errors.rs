//! Mapping of engine errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use sports_tournament::TournamentError;

use crate::logging::log_domain_rejection;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for an engine error
pub fn status_for(error: &TournamentError) -> StatusCode {
    match error {
        TournamentError::PhaseNotFound(_)
        | TournamentError::MatchdayNotFound(_)
        | TournamentError::MatchNotFound(_) => StatusCode::NOT_FOUND,

        TournamentError::NotReady { .. }
        | TournamentError::AlreadyCompleted(_)
        | TournamentError::BracketNotSeeded(_)
        | TournamentError::UnsupportedPhaseType { .. }
        | TournamentError::PhaseTypeLocked(_) => StatusCode::CONFLICT,

        TournamentError::InsufficientTeams { .. }
        | TournamentError::DuplicateTeam(_)
        | TournamentError::InvalidResult(_)
        | TournamentError::InvalidResultForKnockout(_) => StatusCode::UNPROCESSABLE_ENTITY,

        TournamentError::Database(_)
        | TournamentError::Serialization(_)
        | TournamentError::Timeout(_)
        | TournamentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log an engine error and turn it into a response
pub fn reject(
    request_id: &str,
    operation: &str,
    target_id: i64,
    error: TournamentError,
) -> ApiError {
    log_domain_rejection(request_id, operation, target_id, &error);
    (
        status_for(&error),
        Json(ErrorResponse {
            error: error.client_message(),
        }),
    )
}

/// Response for a request the engine never saw
pub fn unprocessable(message: impl Into<String>) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
