//! League tables.
//!
//! Stats are never edited by hand: they are recomputed from every completed match under a
//! phase or tournament and written back onto the registrations.
//!
//! ## Example
//!
//! ```
//! use sports_tournament::standings::{StandingsConfig, aggregate};
//!
//! let table = aggregate(&[1, 2], &[], &StandingsConfig::default());
//! assert_eq!(table.len(), 2);
//! assert_eq!(table[0].rank, 1);
//! ```

pub mod aggregator;
pub mod config;

pub use aggregator::{TeamStanding, aggregate, apply_to_registrations, sort_registrations};
pub use config::StandingsConfig;
