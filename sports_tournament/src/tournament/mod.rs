//! Domain model shared by every part of the engine.
//!
//! Phases own ordered matchdays, matchdays own matches, and registrations carry the
//! accumulated table statistics of a team within a phase or a whole tournament.

pub mod errors;
pub mod models;

pub use errors::{TournamentError, TournamentResult};
pub use models::{
    EventKind, Match, MatchEvent, MatchId, MatchResult, Matchday, MatchdayId, MatchdayView,
    MAX_SCORE, NewMatch, NewMatchday, Phase, PhaseId, PhaseKind, RankingKey, Registration, RegistrationId,
    ResultSubmission, ScheduleFormat, Side, StandingsScope, Stats, TeamId, TournamentId,
    derive_result,
};
