//! Tournament error types.

use std::time::Duration;
use thiserror::Error;

use super::models::{MatchId, MatchdayId, PhaseId, PhaseKind, TeamId};

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Insufficient teams: need {needed}, have {actual}")]
    InsufficientTeams { needed: usize, actual: usize },

    #[error("Team {0} appears more than once")]
    DuplicateTeam(TeamId),

    #[error("Round {round} is not complete: {pending} match(es) pending")]
    NotReady { round: u32, pending: usize },

    #[error("Match {0} is a knockout match and cannot end in a draw")]
    InvalidResultForKnockout(MatchId),

    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Phase {0} is already completed")]
    AlreadyCompleted(PhaseId),

    #[error("Phase {0} has no bracket yet")]
    BracketNotSeeded(PhaseId),

    #[error("Operation '{operation}' is not supported for {kind} phase {phase_id}")]
    UnsupportedPhaseType {
        phase_id: PhaseId,
        kind: PhaseKind,
        operation: &'static str,
    },

    #[error("Phase {0} already has matchdays; its type can no longer change")]
    PhaseTypeLocked(PhaseId),

    #[error("Phase not found: {0}")]
    PhaseNotFound(PhaseId),

    #[error("Matchday not found: {0}")]
    MatchdayNotFound(MatchdayId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TournamentError {
    /// Whether the error is caused by the request rather than by the infrastructure
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            TournamentError::Database(_)
                | TournamentError::Serialization(_)
                | TournamentError::Timeout(_)
                | TournamentError::Storage(_)
        )
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_)
            | TournamentError::Serialization(_)
            | TournamentError::Storage(_) => "Internal server error".to_string(),
            TournamentError::Timeout(_) => "Storage temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_sanitizes_storage() {
        let err = TournamentError::Storage("relation \"matches\" does not exist".to_string());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_message_keeps_domain_errors() {
        let err = TournamentError::NotReady { round: 2, pending: 1 };
        assert!(err.is_client_error());
        assert!(err.client_message().contains("Round 2"));

        let err = TournamentError::UnsupportedPhaseType {
            phase_id: 4,
            kind: PhaseKind::League,
            operation: "advance",
        };
        assert!(err.client_message().contains("league"));
    }

    #[test]
    fn test_timeout_display() {
        let err = TournamentError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }
}
