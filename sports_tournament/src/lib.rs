//! # Sports Tournament
//!
//! Scheduling and standings engine for multi-phase sports tournaments.
//!
//! A tournament is split into phases. League and group phases are played as a round robin
//! generated with the circle method; knockout and final phases are played as a
//! single-elimination bracket that is padded with byes and advanced round by round. Every
//! entered result feeds the league table of its phase and of the whole tournament.
//!
//! ## Core Modules
//!
//! - [`fixture`]: Round-robin fixture generation
//! - [`bracket`]: Knockout bracket seeding and advancement
//! - [`standings`]: Table aggregation and ranking
//! - [`phase`]: Orchestration of the above against storage
//! - [`db`]: Repository trait with PostgreSQL and in-memory implementations
//! - [`tournament`]: Domain model and errors
//!
//! ## Example
//!
//! ```
//! use sports_tournament::bracket;
//!
//! // Six teams: two byes pad the bracket to eight
//! let round = bracket::seed(&[1, 2, 3, 4, 5, 6], None).unwrap();
//! assert_eq!(round.matches.len(), 4);
//! assert_eq!(round.matches.iter().filter(|m| m.team_b.is_none()).count(), 2);
//! ```

/// Knockout brackets.
pub mod bracket;

/// Persistence: repository trait, PostgreSQL and in-memory implementations.
pub mod db;

/// Environment helpers for configuration.
pub mod env;

/// League fixture generation.
pub mod fixture;

/// Phase orchestration.
pub mod phase;

/// League tables.
pub mod standings;

/// Domain model and errors.
pub mod tournament;

pub use db::{InMemoryRepository, PgTournamentRepository, TournamentRepository};
pub use phase::{AdvanceOutcome, PhaseOrchestrator, SubmissionOutcome};
pub use standings::StandingsConfig;
pub use tournament::{TournamentError, TournamentResult};
