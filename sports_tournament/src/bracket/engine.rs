//! Single-elimination bracket state machine.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::tournament::{
    Match, MatchId, MatchResult, MatchdayView, NewMatch, NewMatchday, PhaseId, TeamId,
    TournamentError, TournamentResult,
};

/// Lifecycle of a knockout phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BracketState {
    /// No round has been created yet
    NotSeeded,
    /// Round 1 exists and none of its fixtures has been decided
    Seeded,
    /// Some round is being played
    RoundInProgress { round: u32 },
    /// The final has been decided
    Completed { champion: TeamId },
}

/// What advancing a bracket produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// Next round to persist
    NextRound(NewMatchday),
    /// The completed round was the final
    Champion(TeamId),
}

/// Smallest power of two that fits `team_count` teams.
pub fn bracket_size(team_count: usize) -> usize {
    team_count.max(1).next_power_of_two()
}

/// Number of rounds needed to decide a bracket of `team_count` teams.
pub fn total_rounds(team_count: usize) -> u32 {
    bracket_size(team_count).trailing_zeros()
}

/// Build round 1 of a bracket.
///
/// The bracket is padded to the next power of two. The first `bracket_size - n` seeds in
/// input order receive a bye, which is stored as an already completed match without an
/// opponent. The remaining seeds are paired in order.
///
/// # Errors
///
/// * `TournamentError::InsufficientTeams` - Fewer than two teams
/// * `TournamentError::DuplicateTeam` - A team is listed twice
pub fn seed(team_ids: &[TeamId], date: Option<NaiveDate>) -> TournamentResult<NewMatchday> {
    if team_ids.len() < 2 {
        return Err(TournamentError::InsufficientTeams {
            needed: 2,
            actual: team_ids.len(),
        });
    }
    let mut seen = HashSet::with_capacity(team_ids.len());
    if let Some(&duplicate) = team_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(TournamentError::DuplicateTeam(duplicate));
    }

    let bye_count = bracket_size(team_ids.len()) - team_ids.len();
    let (bye_seeds, playing) = team_ids.split_at(bye_count);

    let mut matches: Vec<NewMatch> = bye_seeds
        .iter()
        .map(|&team| NewMatch::bye(team, date))
        .collect();
    matches.extend(
        playing
            .chunks_exact(2)
            .map(|pair| NewMatch::fixture(pair[0], pair[1], date)),
    );

    log::debug!(
        "Seeded bracket of {} team(s): {} bye(s), {} match(es) in round 1",
        team_ids.len(),
        bye_count,
        matches.len()
    );

    Ok(NewMatchday {
        order: 1,
        date,
        matches,
    })
}

/// Reject results a knockout match cannot have.
pub fn validate_result(match_id: MatchId, result: Option<MatchResult>) -> TournamentResult<()> {
    match result {
        Some(MatchResult::Draw) => Err(TournamentError::InvalidResultForKnockout(match_id)),
        _ => Ok(()),
    }
}

/// Knockout phase loaded from storage
#[derive(Debug, Clone)]
pub struct Bracket {
    phase_id: PhaseId,
    rounds: Vec<MatchdayView>,
    champion: Option<TeamId>,
}

impl Bracket {
    /// Create a bracket view over the persisted rounds of a phase
    pub fn new(phase_id: PhaseId, mut rounds: Vec<MatchdayView>, champion: Option<TeamId>) -> Self {
        rounds.sort_by_key(|round| round.matchday.order);
        Self {
            phase_id,
            rounds,
            champion,
        }
    }

    pub fn rounds(&self) -> &[MatchdayView] {
        &self.rounds
    }

    /// Latest round, the only one that may still receive results
    pub fn current_round(&self) -> Option<&MatchdayView> {
        self.rounds.last()
    }

    /// Winner of a decided final that has not been recorded on the phase yet
    pub fn decided_final(&self) -> Option<TeamId> {
        match self.current_round()?.matches.as_slice() {
            [final_match] => final_match.winner(),
            _ => None,
        }
    }

    pub fn state(&self) -> BracketState {
        if let Some(champion) = self.champion.or_else(|| self.decided_final()) {
            return BracketState::Completed { champion };
        }

        let Some(current) = self.current_round() else {
            return BracketState::NotSeeded;
        };

        let any_played = current
            .matches
            .iter()
            .any(|m| !m.is_bye() && m.completed);
        if self.rounds.len() == 1 && !any_played {
            BracketState::Seeded
        } else {
            BracketState::RoundInProgress {
                round: current.matchday.order,
            }
        }
    }

    /// Close the current round.
    ///
    /// Winners are paired in bracket order, match `2i` against match `2i + 1`; an unpaired
    /// winner gets a bye. A round consisting of a single decided match yields the champion.
    ///
    /// # Errors
    ///
    /// * `TournamentError::AlreadyCompleted` - The champion is already known
    /// * `TournamentError::BracketNotSeeded` - No round exists
    /// * `TournamentError::NotReady` - A match of the current round is not completed
    /// * `TournamentError::InvalidResultForKnockout` - A completed match has no winner
    pub fn advance(&self, days_between_rounds: u32) -> TournamentResult<Advancement> {
        if self.champion.is_some() {
            return Err(TournamentError::AlreadyCompleted(self.phase_id));
        }

        let current = self
            .current_round()
            .ok_or(TournamentError::BracketNotSeeded(self.phase_id))?;

        let pending = current.matches.iter().filter(|m| !m.completed).count();
        if pending > 0 {
            return Err(TournamentError::NotReady {
                round: current.matchday.order,
                pending,
            });
        }

        let winners = current
            .matches
            .iter()
            .map(winner_of)
            .collect::<TournamentResult<Vec<TeamId>>>()?;

        if let [champion] = winners.as_slice() {
            return Ok(Advancement::Champion(*champion));
        }
        if winners.is_empty() {
            return Err(TournamentError::BracketNotSeeded(self.phase_id));
        }

        let date = current.matchday.date.and_then(|date| {
            date.checked_add_days(Days::new(u64::from(days_between_rounds)))
        });

        let mut matches = Vec::with_capacity(winners.len().div_ceil(2));
        for pair in winners.chunks(2) {
            match *pair {
                [team_a, team_b] => matches.push(NewMatch::fixture(team_a, team_b, date)),
                [team] => matches.push(NewMatch::bye(team, date)),
                _ => {}
            }
        }

        Ok(Advancement::NextRound(NewMatchday {
            order: current.matchday.order + 1,
            date,
            matches,
        }))
    }
}

fn winner_of(m: &Match) -> TournamentResult<TeamId> {
    m.winner()
        .ok_or(TournamentError::InvalidResultForKnockout(m.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::Matchday;

    /// Persist a drafted round the way a repository would
    fn materialize(phase_id: PhaseId, draft: NewMatchday, next_id: &mut i64) -> MatchdayView {
        let matchday_id = *next_id;
        *next_id += 1;
        let matches: Vec<Match> = draft
            .matches
            .into_iter()
            .map(|m| {
                let id = *next_id;
                *next_id += 1;
                Match {
                    id,
                    matchday_id,
                    team_a: m.team_a,
                    team_b: m.team_b,
                    date: m.date,
                    home_score: None,
                    away_score: None,
                    result: m.result,
                    completed: m.completed,
                    events: Vec::new(),
                }
            })
            .collect();
        MatchdayView {
            matchday: Matchday {
                id: matchday_id,
                phase_id,
                order: draft.order,
                date: draft.date,
                match_ids: matches.iter().map(|m| m.id).collect(),
            },
            matches,
        }
    }

    /// Home side wins every open match 1-0
    fn play_round(round: &mut MatchdayView) {
        for m in round.matches.iter_mut().filter(|m| !m.completed) {
            m.home_score = Some(1);
            m.away_score = Some(0);
            m.result = Some(MatchResult::TeamA);
            m.completed = true;
        }
    }

    #[test]
    fn test_bracket_size() {
        assert_eq!(bracket_size(2), 2);
        assert_eq!(bracket_size(5), 8);
        assert_eq!(bracket_size(6), 8);
        assert_eq!(bracket_size(8), 8);
        assert_eq!(bracket_size(9), 16);
        assert_eq!(total_rounds(6), 3);
        assert_eq!(total_rounds(16), 4);
    }

    #[test]
    fn test_seed_six_teams() {
        let round = seed(&[1, 2, 3, 4, 5, 6], None).unwrap();

        assert_eq!(round.order, 1);
        assert_eq!(round.matches.len(), 4);

        let byes: Vec<&NewMatch> = round.matches.iter().filter(|m| m.team_b.is_none()).collect();
        assert_eq!(byes.len(), 2);
        assert_eq!(byes[0].team_a, 1);
        assert_eq!(byes[1].team_a, 2);
        assert!(byes.iter().all(|m| m.completed && m.result == Some(MatchResult::TeamA)));

        assert_eq!(round.matches[2], NewMatch::fixture(3, 4, None));
        assert_eq!(round.matches[3], NewMatch::fixture(5, 6, None));
    }

    #[test]
    fn test_seed_power_of_two_has_no_byes() {
        let round = seed(&[1, 2, 3, 4, 5, 6, 7, 8], None).unwrap();
        assert_eq!(round.matches.len(), 4);
        assert!(round.matches.iter().all(|m| m.team_b.is_some() && !m.completed));
    }

    #[test]
    fn test_seed_rejects_invalid_input() {
        assert!(matches!(
            seed(&[1], None),
            Err(TournamentError::InsufficientTeams { needed: 2, actual: 1 })
        ));
        assert!(matches!(
            seed(&[1, 2, 2], None),
            Err(TournamentError::DuplicateTeam(2))
        ));
    }

    #[test]
    fn test_six_team_bracket_to_champion() {
        let mut next_id = 1;
        let mut rounds = vec![materialize(
            7,
            seed(&[1, 2, 3, 4, 5, 6], None).unwrap(),
            &mut next_id,
        )];
        assert_eq!(Bracket::new(7, rounds.clone(), None).state(), BracketState::Seeded);

        let mut sizes = vec![rounds[0].matches.len()];
        loop {
            play_round(rounds.last_mut().unwrap());
            match Bracket::new(7, rounds.clone(), None).advance(7).unwrap() {
                Advancement::NextRound(draft) => {
                    sizes.push(draft.matches.len());
                    rounds.push(materialize(7, draft, &mut next_id));
                }
                Advancement::Champion(champion) => {
                    // Seed 1 had a bye and home sides always win
                    assert_eq!(champion, 1);
                    break;
                }
            }
        }
        assert_eq!(sizes, vec![4, 2, 1]);

        let completed = Bracket::new(7, rounds.clone(), Some(1));
        assert_eq!(completed.state(), BracketState::Completed { champion: 1 });
        assert!(matches!(
            completed.advance(7),
            Err(TournamentError::AlreadyCompleted(7))
        ));
    }

    #[test]
    fn test_second_round_pairs_winners_in_order() {
        let mut next_id = 1;
        let mut round = materialize(1, seed(&[1, 2, 3, 4, 5, 6], None).unwrap(), &mut next_id);
        // Away sides win the played fixtures
        for m in round.matches.iter_mut().filter(|m| !m.completed) {
            m.result = Some(MatchResult::TeamB);
            m.completed = true;
        }

        let Advancement::NextRound(next) = Bracket::new(1, vec![round], None).advance(7).unwrap()
        else {
            panic!("expected a next round");
        };
        assert_eq!(next.order, 2);
        assert_eq!(
            next.matches,
            vec![NewMatch::fixture(1, 2, None), NewMatch::fixture(4, 6, None)]
        );
    }

    #[test]
    fn test_advance_not_ready() {
        let mut next_id = 1;
        let round = materialize(3, seed(&[1, 2, 3, 4, 5, 6], None).unwrap(), &mut next_id);
        let err = Bracket::new(3, vec![round], None).advance(7).unwrap_err();
        assert!(matches!(err, TournamentError::NotReady { round: 1, pending: 2 }));
    }

    #[test]
    fn test_advance_without_rounds() {
        let err = Bracket::new(3, Vec::new(), None).advance(7).unwrap_err();
        assert!(matches!(err, TournamentError::BracketNotSeeded(3)));
        assert_eq!(Bracket::new(3, Vec::new(), None).state(), BracketState::NotSeeded);
    }

    #[test]
    fn test_drawn_match_blocks_advance() {
        let mut next_id = 1;
        let mut round = materialize(3, seed(&[1, 2, 3, 4], None).unwrap(), &mut next_id);
        for m in round.matches.iter_mut() {
            m.result = Some(MatchResult::Draw);
            m.completed = true;
        }
        let first_id = round.matches[0].id;
        let err = Bracket::new(3, vec![round], None).advance(7).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidResultForKnockout(id) if id == first_id));
    }

    #[test]
    fn test_odd_winner_count_gets_bye() {
        let mut next_id = 1;
        let draft = NewMatchday {
            order: 1,
            date: None,
            matches: vec![
                NewMatch::fixture(1, 2, None),
                NewMatch::fixture(3, 4, None),
                NewMatch::fixture(5, 6, None),
            ],
        };
        let mut round = materialize(2, draft, &mut next_id);
        play_round(&mut round);

        let Advancement::NextRound(next) = Bracket::new(2, vec![round], None).advance(7).unwrap()
        else {
            panic!("expected a next round");
        };
        assert_eq!(
            next.matches,
            vec![NewMatch::fixture(1, 3, None), NewMatch::bye(5, None)]
        );
    }

    #[test]
    fn test_next_round_is_dated_after_previous() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut next_id = 1;
        let mut round = materialize(2, seed(&[1, 2, 3, 4], Some(date)).unwrap(), &mut next_id);
        play_round(&mut round);

        let Advancement::NextRound(next) = Bracket::new(2, vec![round], None).advance(3).unwrap()
        else {
            panic!("expected a next round");
        };
        assert_eq!(next.date, NaiveDate::from_ymd_opt(2025, 6, 4));
    }

    #[test]
    fn test_validate_result() {
        assert!(validate_result(1, Some(MatchResult::TeamA)).is_ok());
        assert!(validate_result(1, None).is_ok());
        assert!(matches!(
            validate_result(9, Some(MatchResult::Draw)),
            Err(TournamentError::InvalidResultForKnockout(9))
        ));
    }

    #[test]
    fn test_state_in_progress_after_first_result() {
        let mut next_id = 1;
        let mut round = materialize(2, seed(&[1, 2, 3, 4], None).unwrap(), &mut next_id);
        round.matches[0].result = Some(MatchResult::TeamA);
        round.matches[0].completed = true;
        assert_eq!(
            Bracket::new(2, vec![round], None).state(),
            BracketState::RoundInProgress { round: 1 }
        );
    }
}
