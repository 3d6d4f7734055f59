//! Standings configuration: points per outcome and fair play weights.

use serde::{Deserialize, Serialize};

use crate::env::parse_env_or;
use crate::tournament::EventKind;

/// Points and discipline weights used when building a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsConfig {
    /// Points for a win
    pub win_points: i32,
    /// Points for a draw
    pub draw_points: i32,
    /// Points for a loss
    pub loss_points: i32,
    /// Fair play deduction per yellow card
    pub yellow_card_weight: i32,
    /// Fair play deduction per blue card
    pub blue_card_weight: i32,
    /// Fair play deduction per red card
    pub red_card_weight: i32,
}

impl StandingsConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `WIN_POINTS` (default: 3)
    /// - `DRAW_POINTS` (default: 1)
    /// - `LOSS_POINTS` (default: 0)
    /// - `YELLOW_CARD_WEIGHT` (default: 1)
    /// - `BLUE_CARD_WEIGHT` (default: 2)
    /// - `RED_CARD_WEIGHT` (default: 3)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            win_points: parse_env_or("WIN_POINTS", defaults.win_points),
            draw_points: parse_env_or("DRAW_POINTS", defaults.draw_points),
            loss_points: parse_env_or("LOSS_POINTS", defaults.loss_points),
            yellow_card_weight: parse_env_or("YELLOW_CARD_WEIGHT", defaults.yellow_card_weight),
            blue_card_weight: parse_env_or("BLUE_CARD_WEIGHT", defaults.blue_card_weight),
            red_card_weight: parse_env_or("RED_CARD_WEIGHT", defaults.red_card_weight),
        }
    }

    /// Fair play deduction for an event, zero for non-disciplinary events
    pub fn fair_play_penalty(&self, kind: EventKind) -> i32 {
        match kind {
            EventKind::YellowCard => self.yellow_card_weight,
            EventKind::BlueCard => self.blue_card_weight,
            EventKind::RedCard => self.red_card_weight,
            EventKind::Goal | EventKind::OwnGoal | EventKind::Substitution => 0,
        }
    }
}

impl Default for StandingsConfig {
    fn default() -> Self {
        Self {
            win_points: 3,
            draw_points: 1,
            loss_points: 0,
            yellow_card_weight: 1,
            blue_card_weight: 2,
            red_card_weight: 3,
        }
    }
}
