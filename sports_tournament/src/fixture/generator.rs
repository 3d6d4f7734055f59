//! Round-robin fixture generation using the circle method.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::tournament::{NewMatch, NewMatchday, TeamId, TournamentError, TournamentResult};

/// Default number of days between two consecutive rounds
pub const DEFAULT_DAYS_BETWEEN_ROUNDS: u32 = 7;

/// Options for generating a league fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureOptions {
    /// Append a second leg with home and away swapped
    pub double_round: bool,
    /// First possible date of round 1. Without it no dates are assigned.
    pub start_date: Option<NaiveDate>,
    /// Weekday every round is played on
    pub weekday: Option<Weekday>,
    pub days_between_rounds: u32,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            double_round: false,
            start_date: None,
            weekday: None,
            days_between_rounds: DEFAULT_DAYS_BETWEEN_ROUNDS,
        }
    }
}

impl FixtureOptions {
    pub fn single_round() -> Self {
        Self::default()
    }

    pub fn double_round() -> Self {
        Self {
            double_round: true,
            ..Self::default()
        }
    }

    pub fn starting(mut self, start_date: NaiveDate, weekday: Option<Weekday>) -> Self {
        self.start_date = Some(start_date);
        self.weekday = weekday;
        self
    }
}

/// Home/away pairing within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pairing {
    pub home: TeamId,
    pub away: TeamId,
}

impl Pairing {
    pub fn swapped(self) -> Self {
        Self {
            home: self.away,
            away: self.home,
        }
    }
}

/// Generate the matchday skeletons of a league phase.
///
/// Rounds are produced with the circle method: with an odd number of teams a bye slot is
/// added, the first team stays fixed and the rest rotate. Pairings against the bye slot are
/// left out, so that team is idle for the round. The output depends only on the order of
/// `team_ids` and on `options`.
///
/// # Errors
///
/// * `TournamentError::InsufficientTeams` - Fewer than two teams
/// * `TournamentError::DuplicateTeam` - A team is listed twice
pub fn generate(
    team_ids: &[TeamId],
    options: &FixtureOptions,
) -> TournamentResult<Vec<NewMatchday>> {
    validate_teams(team_ids)?;

    let first_leg = round_robin_pairings(team_ids);
    let second_leg: Vec<Vec<Pairing>> = if options.double_round {
        first_leg
            .iter()
            .map(|round| round.iter().map(|p| p.swapped()).collect())
            .collect()
    } else {
        Vec::new()
    };

    let first_date = options
        .start_date
        .map(|start| first_playable_date(start, options.weekday));

    let matchdays = first_leg
        .into_iter()
        .chain(second_leg)
        .enumerate()
        .map(|(index, pairings)| {
            let date = first_date.and_then(|first| {
                first.checked_add_days(Days::new(
                    index as u64 * u64::from(options.days_between_rounds),
                ))
            });
            NewMatchday {
                order: index as u32 + 1,
                date,
                matches: pairings
                    .into_iter()
                    .map(|p| NewMatch::fixture(p.home, p.away, date))
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Generated {} matchday(s) for {} team(s), double round: {}",
        matchdays.len(),
        team_ids.len(),
        options.double_round
    );

    Ok(matchdays)
}

/// Single-leg round-robin pairings, one inner vector per round.
pub fn round_robin_pairings(team_ids: &[TeamId]) -> Vec<Vec<Pairing>> {
    let mut slots: Vec<Option<TeamId>> = team_ids.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }

    let slot_count = slots.len();
    if slot_count < 2 {
        return Vec::new();
    }

    let mut rounds = Vec::with_capacity(slot_count - 1);
    for round in 0..slot_count - 1 {
        let mut pairings = Vec::with_capacity(slot_count / 2);
        for i in 0..slot_count / 2 {
            let (mut home, mut away) = (slots[i], slots[slot_count - 1 - i]);
            // Alternate the fixed team between home and away
            if i == 0 && round % 2 == 1 {
                std::mem::swap(&mut home, &mut away);
            }
            if let (Some(home), Some(away)) = (home, away) {
                pairings.push(Pairing { home, away });
            }
        }
        rounds.push(pairings);
        slots[1..].rotate_right(1);
    }

    rounds
}

/// Number of rounds in one leg for the given team count.
pub fn rounds_per_leg(team_count: usize) -> usize {
    let slots = team_count + team_count % 2;
    slots.saturating_sub(1)
}

fn validate_teams(team_ids: &[TeamId]) -> TournamentResult<()> {
    if team_ids.len() < 2 {
        return Err(TournamentError::InsufficientTeams {
            needed: 2,
            actual: team_ids.len(),
        });
    }

    let mut seen = HashSet::with_capacity(team_ids.len());
    for &team_id in team_ids {
        if !seen.insert(team_id) {
            return Err(TournamentError::DuplicateTeam(team_id));
        }
    }

    Ok(())
}

fn first_playable_date(start: NaiveDate, weekday: Option<Weekday>) -> NaiveDate {
    let Some(weekday) = weekday else {
        return start;
    };
    let ahead = (7 + weekday.num_days_from_monday() - start.weekday().num_days_from_monday()) % 7;
    start
        .checked_add_days(Days::new(u64::from(ahead)))
        .unwrap_or(start)
}
