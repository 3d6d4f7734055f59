//! Phase orchestration.
//!
//! [`PhaseOrchestrator`] routes each operation to the fixture generator or the bracket
//! engine according to the phase kind, persists what they produce and keeps the tables
//! of the phase and its tournament in step with entered results.
//!
//! ## Example
//!
//! ```
//! use sports_tournament::db::{InMemoryRepository, TournamentRepository};
//! use sports_tournament::fixture::FixtureOptions;
//! use sports_tournament::phase::PhaseOrchestrator;
//! use sports_tournament::tournament::PhaseKind;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(InMemoryRepository::new());
//! let phase = repo.create_phase(1, "Regular season", PhaseKind::League).await?;
//! for team_id in 1..=4 {
//!     repo.register_team(1, Some(phase.id), team_id).await?;
//! }
//!
//! let orchestrator = PhaseOrchestrator::with_defaults(repo);
//! let matchdays = orchestrator
//!     .generate_fixture(phase.id, &FixtureOptions::single_round())
//!     .await?;
//! assert_eq!(matchdays.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;

pub use orchestrator::{AdvanceOutcome, PhaseOrchestrator, SubmissionOutcome};
