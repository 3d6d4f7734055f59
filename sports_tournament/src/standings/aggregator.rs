//! League table aggregation from completed matches.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

use super::config::StandingsConfig;
use crate::tournament::{Match, MatchResult, Registration, Side, Stats, TeamId};

/// One row of a computed table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub stats: Stats,
    /// 1-based table position
    pub rank: u32,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Win,
    Draw,
    Loss,
}

/// Build the table for `team_ids` from every completed match.
///
/// Byes and matches without a result are skipped, as are sides whose team is not in
/// `team_ids`. Goals are only counted when scores were entered. Rows are ranked by
/// points, goal difference, goals for and fair play score, all descending; full ties keep
/// the order of `team_ids`.
pub fn aggregate(
    team_ids: &[TeamId],
    matches: &[Match],
    config: &StandingsConfig,
) -> Vec<TeamStanding> {
    let mut rows: Vec<(TeamId, Stats)> = Vec::with_capacity(team_ids.len());
    let mut index: HashMap<TeamId, usize> = HashMap::with_capacity(team_ids.len());
    for &team_id in team_ids {
        index.entry(team_id).or_insert_with(|| {
            rows.push((team_id, Stats::default()));
            rows.len() - 1
        });
    }

    for m in matches.iter().filter(|m| m.completed) {
        let (Some(team_b), Some(result)) = (m.team_b, m.result) else {
            continue;
        };

        let (outcome_a, outcome_b) = match result {
            MatchResult::TeamA => (Outcome::Win, Outcome::Loss),
            MatchResult::TeamB => (Outcome::Loss, Outcome::Win),
            MatchResult::Draw => (Outcome::Draw, Outcome::Draw),
        };

        if let Some(&i) = index.get(&m.team_a) {
            record(&mut rows[i].1, outcome_a, m.home_score, m.away_score, config);
        }
        if let Some(&i) = index.get(&team_b) {
            record(&mut rows[i].1, outcome_b, m.away_score, m.home_score, config);
        }

        for event in m.events.iter().filter(|e| e.kind.is_disciplinary()) {
            let team = match event.side {
                Side::TeamA => m.team_a,
                Side::TeamB => team_b,
            };
            if let Some(&i) = index.get(&team) {
                let stats = &mut rows[i].1;
                stats.fair_play_score =
                    stats.fair_play_score.saturating_sub(config.fair_play_penalty(event.kind));
            }
        }
    }

    let mut standings: Vec<TeamStanding> = rows
        .into_iter()
        .map(|(team_id, mut stats)| {
            stats.goal_difference = goal_difference(stats.goals_for, stats.goals_against);
            TeamStanding {
                team_id,
                stats,
                rank: 0,
            }
        })
        .collect();

    standings.sort_by_key(|row| Reverse(row.stats.ranking_key()));
    for (position, row) in standings.iter_mut().enumerate() {
        row.rank = position as u32 + 1;
    }

    standings
}

fn record(
    stats: &mut Stats,
    outcome: Outcome,
    scored: Option<u32>,
    conceded: Option<u32>,
    config: &StandingsConfig,
) {
    stats.played = stats.played.saturating_add(1);
    let points = match outcome {
        Outcome::Win => {
            stats.wins = stats.wins.saturating_add(1);
            config.win_points
        }
        Outcome::Draw => {
            stats.draws = stats.draws.saturating_add(1);
            config.draw_points
        }
        Outcome::Loss => {
            stats.losses = stats.losses.saturating_add(1);
            config.loss_points
        }
    };
    stats.points = stats.points.saturating_add(points);
    stats.goals_for = stats.goals_for.saturating_add(scored.unwrap_or(0));
    stats.goals_against = stats.goals_against.saturating_add(conceded.unwrap_or(0));
}

/// Goals for minus goals against, clamped to the `i32` range
fn goal_difference(goals_for: u32, goals_against: u32) -> i32 {
    let difference = i64::from(goals_for) - i64::from(goals_against);
    difference.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Write computed rows onto their registrations, returned in table order.
///
/// Registrations without a row are reset to empty stats and placed after the ranked ones.
pub fn apply_to_registrations(
    registrations: &[Registration],
    standings: &[TeamStanding],
) -> Vec<Registration> {
    let by_team: HashMap<TeamId, &TeamStanding> =
        standings.iter().map(|row| (row.team_id, row)).collect();

    let mut updated: Vec<Registration> = registrations
        .iter()
        .map(|registration| {
            let mut registration = registration.clone();
            match by_team.get(&registration.team_id) {
                Some(row) => {
                    registration.stats = row.stats;
                    registration.rank = Some(row.rank);
                }
                None => {
                    registration.stats = Stats::default();
                    registration.rank = None;
                }
            }
            registration
        })
        .collect();

    updated.sort_by_key(|r| r.rank.unwrap_or(u32::MAX));
    updated
}

/// Sort stored registrations into table order.
pub fn sort_registrations(registrations: &mut [Registration]) {
    registrations.sort_by_key(|r| Reverse(r.stats.ranking_key()));
}
