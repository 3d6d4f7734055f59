//! Knockout brackets.
//!
//! A bracket is seeded once per knockout phase and then advanced round by round until a
//! single match remains and is decided. Byes pad the first round to a power of two.

pub mod engine;

pub use engine::{
    Advancement, Bracket, BracketState, bracket_size, seed, total_rounds, validate_result,
};
