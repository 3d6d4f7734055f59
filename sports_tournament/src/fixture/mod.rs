//! League fixture generation.
//!
//! Produces the matchday skeletons of a round-robin phase: one matchday per round, every
//! team meeting every other team once, or twice with home and away swapped when a double
//! round is requested.
//!
//! ## Example
//!
//! ```
//! use sports_tournament::fixture::{FixtureOptions, generate};
//!
//! let matchdays = generate(&[1, 2, 3, 4], &FixtureOptions::double_round()).unwrap();
//! assert_eq!(matchdays.len(), 6);
//! ```

pub mod generator;

pub use generator::{
    DEFAULT_DAYS_BETWEEN_ROUNDS, FixtureOptions, Pairing, generate, round_robin_pairings,
    rounds_per_leg,
};
