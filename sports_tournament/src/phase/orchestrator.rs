//! Phase orchestrator composing fixture generation, brackets and standings with storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::bracket::{self, Advancement, Bracket, BracketState};
use crate::db::TournamentRepository;
use crate::fixture::{self, DEFAULT_DAYS_BETWEEN_ROUNDS, FixtureOptions};
use crate::standings::{self, StandingsConfig};
use crate::tournament::{
    MAX_SCORE, Match, MatchId, MatchResult, MatchdayView, Phase, PhaseId, PhaseKind,
    Registration, ResultSubmission, ScheduleFormat, StandingsScope, TeamId, TournamentError,
    TournamentId, TournamentResult, derive_result,
};

/// Result of advancing a knockout phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The next round was created
    NextRound(MatchdayView),
    /// The final was decided
    Champion(TeamId),
}

/// Result of entering a match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// The match as stored
    pub recorded: Match,
    /// Every match of the match's round is now completed
    pub round_complete: bool,
    /// Set when this result decided a knockout final
    pub champion: Option<TeamId>,
    /// Recomputed table of the match's phase
    pub standings: Vec<Registration>,
}

/// One async lock per id, created on first use
type LockRegistry = Arc<RwLock<HashMap<i64, Arc<Mutex<()>>>>>;

/// Phase orchestrator
///
/// Every mutating operation holds the phase's lock for its whole duration, so operations
/// on one phase run one at a time while different phases proceed in parallel. The
/// tournament table is shared by all phases of a tournament and is rebuilt under a
/// tournament lock, always taken after any phase lock.
pub struct PhaseOrchestrator {
    /// Storage
    repo: Arc<dyn TournamentRepository>,

    /// Points and fair play weights
    standings: StandingsConfig,

    /// Gap between a knockout round and the next
    days_between_rounds: u32,

    /// One lock per phase touched so far
    phase_locks: LockRegistry,

    /// One lock per tournament table rebuilt so far
    tournament_locks: LockRegistry,
}

impl PhaseOrchestrator {
    /// Create a new phase orchestrator
    ///
    /// # Arguments
    ///
    /// * `repo` - Storage for phases, matches and registrations
    /// * `standings` - Points and fair play weights
    /// * `days_between_rounds` - Gap between two dated knockout rounds
    pub fn new(
        repo: Arc<dyn TournamentRepository>,
        standings: StandingsConfig,
        days_between_rounds: u32,
    ) -> Self {
        Self {
            repo,
            standings,
            days_between_rounds,
            phase_locks: Arc::new(RwLock::new(HashMap::new())),
            tournament_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Orchestrator with default standings configuration and a weekly round interval
    pub fn with_defaults(repo: Arc<dyn TournamentRepository>) -> Self {
        Self::new(repo, StandingsConfig::default(), DEFAULT_DAYS_BETWEEN_ROUNDS)
    }

    pub fn repository(&self) -> &Arc<dyn TournamentRepository> {
        &self.repo
    }

    pub fn standings_config(&self) -> &StandingsConfig {
        &self.standings
    }

    /// Generate the league fixture of a round-robin phase from its registrations.
    ///
    /// Any existing matchdays of the phase are replaced in one atomic write.
    ///
    /// # Errors
    ///
    /// * `TournamentError::PhaseNotFound` - Phase does not exist
    /// * `TournamentError::UnsupportedPhaseType` - Phase is not played as a round robin
    /// * `TournamentError::InsufficientTeams` - Fewer than two registered teams
    pub async fn generate_fixture(
        &self,
        phase_id: PhaseId,
        options: &FixtureOptions,
    ) -> TournamentResult<Vec<MatchdayView>> {
        let _guard = self.lock_phase(phase_id).await;
        let phase = self.load_phase(phase_id).await?;
        require_format(&phase, ScheduleFormat::RoundRobin, "generate_fixture")?;

        let team_ids = self.phase_team_ids(phase_id).await?;
        let drafts = fixture::generate(&team_ids, options)?;
        self.repo.replace_matchdays(phase_id, &drafts).await?;

        log::info!(
            "Generated fixture for phase {} ({}): {} team(s), {} matchday(s)",
            phase_id,
            phase.kind,
            team_ids.len(),
            drafts.len()
        );

        self.refresh_standings(&phase).await?;
        self.load_views(phase_id).await
    }

    /// Seed round 1 of a knockout phase from its registrations.
    ///
    /// Re-seeding replaces the whole bracket and clears any recorded champion.
    ///
    /// # Errors
    ///
    /// * `TournamentError::PhaseNotFound` - Phase does not exist
    /// * `TournamentError::UnsupportedPhaseType` - Phase is not played as a bracket
    /// * `TournamentError::InsufficientTeams` - Fewer than two registered teams
    pub async fn create_bracket(
        &self,
        phase_id: PhaseId,
        start_date: Option<NaiveDate>,
    ) -> TournamentResult<MatchdayView> {
        let _guard = self.lock_phase(phase_id).await;
        let phase = self.load_phase(phase_id).await?;
        require_format(&phase, ScheduleFormat::Bracket, "create_bracket")?;

        let team_ids = self.phase_team_ids(phase_id).await?;
        let first_round = bracket::seed(&team_ids, start_date)?;
        let mut stored = self
            .repo
            .replace_matchdays(phase_id, std::slice::from_ref(&first_round))
            .await?;
        let matchday = stored
            .pop()
            .ok_or_else(|| TournamentError::Storage("seeded round was not stored".to_string()))?;

        log::info!(
            "Created bracket for phase {}: {} team(s), bracket size {}",
            phase_id,
            team_ids.len(),
            bracket::bracket_size(team_ids.len())
        );

        self.refresh_standings(&phase).await?;
        let matches = self.repo.matches_of_matchday(matchday.id).await?;
        Ok(MatchdayView { matchday, matches })
    }

    /// Close the current knockout round and create the next, or record the champion.
    ///
    /// # Errors
    ///
    /// * `TournamentError::UnsupportedPhaseType` - Phase is not played as a bracket
    /// * `TournamentError::BracketNotSeeded` - No round exists yet
    /// * `TournamentError::NotReady` - The current round has unplayed matches
    /// * `TournamentError::AlreadyCompleted` - The champion is already known
    pub async fn advance(&self, phase_id: PhaseId) -> TournamentResult<AdvanceOutcome> {
        let _guard = self.lock_phase(phase_id).await;
        let phase = self.load_phase(phase_id).await?;
        require_format(&phase, ScheduleFormat::Bracket, "advance")?;

        let rounds = self.load_views(phase_id).await?;
        let bracket = Bracket::new(phase_id, rounds, phase.champion);

        match bracket.advance(self.days_between_rounds)? {
            Advancement::NextRound(draft) => {
                let matchday = self.repo.append_matchday(phase_id, &draft).await?;
                log::info!(
                    "Phase {} advanced to round {} with {} match(es)",
                    phase_id,
                    matchday.order,
                    matchday.match_ids.len()
                );
                let matches = self.repo.matches_of_matchday(matchday.id).await?;
                Ok(AdvanceOutcome::NextRound(MatchdayView { matchday, matches }))
            }
            Advancement::Champion(team_id) => {
                self.repo.set_champion(phase_id, Some(team_id)).await?;
                log::info!("Phase {} completed, champion: team {}", phase_id, team_id);
                Ok(AdvanceOutcome::Champion(team_id))
            }
        }
    }

    /// Current lifecycle state of a knockout phase
    pub async fn bracket_state(&self, phase_id: PhaseId) -> TournamentResult<BracketState> {
        let phase = self.load_phase(phase_id).await?;
        require_format(&phase, ScheduleFormat::Bracket, "bracket_state")?;
        let rounds = self.load_views(phase_id).await?;
        Ok(Bracket::new(phase_id, rounds, phase.champion).state())
    }

    /// Enter the result of a match and recompute the affected tables.
    ///
    /// Scores left out of the submission keep their stored value. The result is derived from
    /// the scores; an explicit outcome may only settle a missing score, or a level score in a
    /// knockout phase. Events are replaced when the submission carries them.
    ///
    /// The match, the champion and the tables are written one after another. When a later
    /// write fails the stored result stands: [`advance`](Self::advance) records a missing
    /// champion and [`recompute_standings`](Self::recompute_standings) rebuilds the tables.
    ///
    /// # Errors
    ///
    /// * `TournamentError::MatchNotFound` - Match does not exist
    /// * `TournamentError::InvalidResult` - Bye, score above [`MAX_SCORE`], contradicting
    ///   outcome, outcome overriding a level league score, no decidable result, or a knockout
    ///   round that has already been advanced from
    /// * `TournamentError::InvalidResultForKnockout` - Draw in a knockout phase
    pub async fn submit_result(
        &self,
        match_id: MatchId,
        submission: ResultSubmission,
    ) -> TournamentResult<SubmissionOutcome> {
        let phase_id = self.phase_of_match(match_id).await?;
        let _guard = self.lock_phase(phase_id).await;

        let mut m = self
            .repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let matchday = self
            .repo
            .find_matchday(m.matchday_id)
            .await?
            .ok_or(TournamentError::MatchdayNotFound(m.matchday_id))?;
        let phase = self.load_phase(matchday.phase_id).await?;
        let format = phase
            .kind
            .schedule_format()
            .ok_or(TournamentError::UnsupportedPhaseType {
                phase_id: phase.id,
                kind: phase.kind,
                operation: "submit_result",
            })?;

        if m.is_bye() {
            return Err(TournamentError::InvalidResult(format!(
                "match {match_id} is a bye"
            )));
        }

        let home_score = submission.home_score.or(m.home_score);
        let away_score = submission.away_score.or(m.away_score);
        let result = resolve_result(match_id, format, home_score, away_score, submission.outcome)?;

        if format == ScheduleFormat::Bracket {
            bracket::validate_result(match_id, Some(result))?;
            let latest = self.repo.matchdays(phase.id).await?.last().map(|md| md.id);
            if latest != Some(matchday.id) {
                return Err(TournamentError::InvalidResult(format!(
                    "round {} of phase {} has already been advanced",
                    matchday.order, phase.id
                )));
            }
        }

        m.home_score = home_score;
        m.away_score = away_score;
        m.result = Some(result);
        m.completed = true;
        if let Some(events) = submission.events {
            m.events = events;
        }
        self.repo.update_match_result(&m).await?;

        log::info!(
            "Recorded result {} ({:?}-{:?}) for match {} in phase {}",
            result,
            home_score,
            away_score,
            match_id,
            phase.id
        );

        let round = self.repo.matches_of_matchday(matchday.id).await?;
        let round_complete = round.iter().all(|m| m.completed);

        let mut champion = None;
        if format == ScheduleFormat::Bracket && round_complete {
            let rounds = self.load_views(phase.id).await?;
            champion = Bracket::new(phase.id, rounds, None).decided_final();
            if let Some(team_id) = champion {
                self.repo.set_champion(phase.id, Some(team_id)).await?;
                log::info!("Phase {} decided, champion: team {}", phase.id, team_id);
            }
        }

        let standings = self.refresh_standings(&phase).await?;

        Ok(SubmissionOutcome {
            recorded: m,
            round_complete,
            champion,
            standings,
        })
    }

    /// Zero the stats of a scope and clear the results of its matches.
    ///
    /// Matchdays and matches stay in place and byes stay completed. Resetting a phase also
    /// rebuilds the tournament table, which counted the cleared results.
    pub async fn reset_stats(&self, scope: StandingsScope) -> TournamentResult<()> {
        let (phase_ids, tournament_id) = match scope {
            StandingsScope::Phase(phase_id) => {
                let phase = self.load_phase(phase_id).await?;
                (vec![phase_id], phase.tournament_id)
            }
            StandingsScope::Tournament(tournament_id) => (
                self.repo
                    .phases_of_tournament(tournament_id)
                    .await?
                    .into_iter()
                    .map(|p| p.id)
                    .collect(),
                tournament_id,
            ),
        };

        // Ascending phase order keeps concurrent tournament resets from deadlocking
        let mut sorted = phase_ids;
        sorted.sort_unstable();
        let mut guards = Vec::with_capacity(sorted.len());
        for phase_id in &sorted {
            guards.push(self.lock_phase(*phase_id).await);
        }

        match scope {
            StandingsScope::Phase(_) => {
                self.repo.reset_scope(scope).await?;
                self.rebuild_table(StandingsScope::Tournament(tournament_id))
                    .await?;
            }
            StandingsScope::Tournament(_) => {
                let _table = self.lock_tournament(tournament_id).await;
                self.repo.reset_scope(scope).await?;
            }
        }
        log::info!("Reset stats for {:?} ({} phase(s))", scope, sorted.len());
        Ok(())
    }

    /// Matchdays of a phase with their matches, in round order
    pub async fn matchdays(&self, phase_id: PhaseId) -> TournamentResult<Vec<MatchdayView>> {
        self.load_phase(phase_id).await?;
        self.load_views(phase_id).await
    }

    /// Stored table of a scope in rank order
    pub async fn standings(&self, scope: StandingsScope) -> TournamentResult<Vec<Registration>> {
        if let StandingsScope::Phase(phase_id) = scope {
            self.load_phase(phase_id).await?;
        }
        let mut registrations = self.repo.registrations(scope).await?;
        standings::sort_registrations(&mut registrations);
        Ok(registrations)
    }

    /// Rebuild the table of a scope from its matches and store it
    ///
    /// # Errors
    ///
    /// * `TournamentError::PhaseNotFound` - Phase scope names an unknown phase
    pub async fn recompute_standings(
        &self,
        scope: StandingsScope,
    ) -> TournamentResult<Vec<Registration>> {
        match scope {
            StandingsScope::Phase(phase_id) => {
                let _guard = self.lock_phase(phase_id).await;
                self.rebuild_table(scope).await
            }
            StandingsScope::Tournament(_) => self.rebuild_table(scope).await,
        }
    }

    /// Rebuild and store a table. The caller holds the lock of a phase scope; the
    /// tournament lock is taken here.
    async fn rebuild_table(&self, scope: StandingsScope) -> TournamentResult<Vec<Registration>> {
        let _table = match scope {
            StandingsScope::Phase(_) => None,
            StandingsScope::Tournament(tournament_id) => {
                Some(self.lock_tournament(tournament_id).await)
            }
        };

        let registrations = self.repo.registrations(scope).await?;
        let phase_ids: Vec<PhaseId> = match scope {
            StandingsScope::Phase(phase_id) => {
                self.load_phase(phase_id).await?;
                vec![phase_id]
            }
            StandingsScope::Tournament(tournament_id) => self
                .repo
                .phases_of_tournament(tournament_id)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect(),
        };

        let mut matches = Vec::new();
        for phase_id in phase_ids {
            for view in self.load_views(phase_id).await? {
                matches.extend(view.matches);
            }
        }

        let team_ids: Vec<TeamId> = registrations.iter().map(|r| r.team_id).collect();
        let table = standings::aggregate(&team_ids, &matches, &self.standings);
        let updated = standings::apply_to_registrations(&registrations, &table);
        self.repo.update_registrations(&updated).await?;

        log::debug!(
            "Recomputed standings for {:?}: {} team(s) from {} match(es)",
            scope,
            updated.len(),
            matches.len()
        );
        Ok(updated)
    }

    /// Change the kind of a phase that has no matchdays yet
    ///
    /// # Errors
    ///
    /// * `TournamentError::PhaseTypeLocked` - The phase already has matchdays
    pub async fn set_phase_kind(&self, phase_id: PhaseId, kind: PhaseKind) -> TournamentResult<Phase> {
        let _guard = self.lock_phase(phase_id).await;
        let mut phase = self.load_phase(phase_id).await?;
        if phase.kind == kind {
            return Ok(phase);
        }
        if !phase.matchday_ids.is_empty() {
            return Err(TournamentError::PhaseTypeLocked(phase_id));
        }

        self.repo.update_phase_kind(phase_id, kind).await?;
        log::info!("Phase {} changed from {} to {}", phase_id, phase.kind, kind);
        phase.kind = kind;
        Ok(phase)
    }

    async fn lock_phase(&self, phase_id: PhaseId) -> OwnedMutexGuard<()> {
        acquire(&self.phase_locks, phase_id).await
    }

    async fn lock_tournament(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        acquire(&self.tournament_locks, tournament_id).await
    }

    async fn load_phase(&self, phase_id: PhaseId) -> TournamentResult<Phase> {
        self.repo
            .find_phase(phase_id)
            .await?
            .ok_or(TournamentError::PhaseNotFound(phase_id))
    }

    async fn phase_of_match(&self, match_id: MatchId) -> TournamentResult<PhaseId> {
        let m = self
            .repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let matchday = self
            .repo
            .find_matchday(m.matchday_id)
            .await?
            .ok_or(TournamentError::MatchdayNotFound(m.matchday_id))?;
        Ok(matchday.phase_id)
    }

    async fn phase_team_ids(&self, phase_id: PhaseId) -> TournamentResult<Vec<TeamId>> {
        Ok(self
            .repo
            .registrations(StandingsScope::Phase(phase_id))
            .await?
            .into_iter()
            .map(|r| r.team_id)
            .collect())
    }

    async fn load_views(&self, phase_id: PhaseId) -> TournamentResult<Vec<MatchdayView>> {
        let matchdays = self.repo.matchdays(phase_id).await?;
        let mut views = Vec::with_capacity(matchdays.len());
        for matchday in matchdays {
            let matches = self.repo.matches_of_matchday(matchday.id).await?;
            views.push(MatchdayView { matchday, matches });
        }
        Ok(views)
    }

    /// Recompute the phase table and the tournament table, returning the phase table
    async fn refresh_standings(&self, phase: &Phase) -> TournamentResult<Vec<Registration>> {
        let table = self.rebuild_table(StandingsScope::Phase(phase.id)).await?;
        self.rebuild_table(StandingsScope::Tournament(phase.tournament_id))
            .await?;
        Ok(table)
    }
}

async fn acquire(locks: &LockRegistry, id: i64) -> OwnedMutexGuard<()> {
    let existing = locks.read().await.get(&id).cloned();
    let lock = match existing {
        Some(lock) => lock,
        None => locks.write().await.entry(id).or_default().clone(),
    };
    lock.lock_owned().await
}

fn require_format(
    phase: &Phase,
    format: ScheduleFormat,
    operation: &'static str,
) -> TournamentResult<()> {
    if phase.kind.schedule_format() == Some(format) {
        Ok(())
    } else {
        Err(TournamentError::UnsupportedPhaseType {
            phase_id: phase.id,
            kind: phase.kind,
            operation,
        })
    }
}

/// Result of a submission: derived from the scores, or the explicit outcome when the
/// scores are missing or level in a knockout.
fn resolve_result(
    match_id: MatchId,
    format: ScheduleFormat,
    home_score: Option<u32>,
    away_score: Option<u32>,
    outcome: Option<MatchResult>,
) -> TournamentResult<MatchResult> {
    if let Some(score) = [home_score, away_score]
        .into_iter()
        .flatten()
        .find(|&score| score > MAX_SCORE)
    {
        return Err(TournamentError::InvalidResult(format!(
            "score {score} of match {match_id} exceeds {MAX_SCORE}"
        )));
    }

    match (derive_result(home_score, away_score), outcome) {
        (Some(derived), Some(explicit))
            if derived != explicit && derived != MatchResult::Draw =>
        {
            Err(TournamentError::InvalidResult(format!(
                "outcome {explicit} contradicts the score of match {match_id}"
            )))
        }
        (Some(MatchResult::Draw), Some(explicit))
            if format == ScheduleFormat::RoundRobin && explicit != MatchResult::Draw =>
        {
            Err(TournamentError::InvalidResult(format!(
                "match {match_id} ended level; a league match is decided by its score"
            )))
        }
        (_, Some(explicit)) => Ok(explicit),
        (Some(derived), None) => Ok(derived),
        (None, None) => Err(TournamentError::InvalidResult(format!(
            "match {match_id} needs both scores or an explicit outcome"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRepository;

    const LEAGUE: ScheduleFormat = ScheduleFormat::RoundRobin;
    const KNOCKOUT: ScheduleFormat = ScheduleFormat::Bracket;

    #[test]
    fn test_resolve_result_from_scores() {
        assert_eq!(
            resolve_result(1, LEAGUE, Some(2), Some(1), None).unwrap(),
            MatchResult::TeamA
        );
        assert_eq!(
            resolve_result(1, LEAGUE, Some(0), Some(0), None).unwrap(),
            MatchResult::Draw
        );
    }

    #[test]
    fn test_resolve_result_outcome_breaks_level_knockout_score() {
        let result =
            resolve_result(1, KNOCKOUT, Some(1), Some(1), Some(MatchResult::TeamB)).unwrap();
        assert_eq!(result, MatchResult::TeamB);
        let walkover = resolve_result(1, LEAGUE, None, None, Some(MatchResult::TeamA)).unwrap();
        assert_eq!(walkover, MatchResult::TeamA);
    }

    #[test]
    fn test_resolve_result_level_league_score_stays_a_draw() {
        assert!(matches!(
            resolve_result(1, LEAGUE, Some(1), Some(1), Some(MatchResult::TeamA)),
            Err(TournamentError::InvalidResult(_))
        ));
        assert_eq!(
            resolve_result(1, LEAGUE, Some(1), Some(1), Some(MatchResult::Draw)).unwrap(),
            MatchResult::Draw
        );
    }

    #[test]
    fn test_resolve_result_rejects_contradiction() {
        assert!(matches!(
            resolve_result(1, LEAGUE, Some(3), Some(0), Some(MatchResult::TeamB)),
            Err(TournamentError::InvalidResult(_))
        ));
        assert!(matches!(
            resolve_result(1, LEAGUE, Some(3), None, None),
            Err(TournamentError::InvalidResult(_))
        ));
    }

    #[test]
    fn test_resolve_result_caps_scores() {
        assert!(resolve_result(1, LEAGUE, Some(MAX_SCORE), Some(0), None).is_ok());
        assert!(matches!(
            resolve_result(1, LEAGUE, Some(0), Some(MAX_SCORE + 1), None),
            Err(TournamentError::InvalidResult(_))
        ));
        assert!(matches!(
            resolve_result(1, KNOCKOUT, Some(3_000_000_000), Some(0), None),
            Err(TournamentError::InvalidResult(_))
        ));
    }

    #[tokio::test]
    async fn test_tournament_lock_is_separate_from_phase_locks() {
        let orchestrator = PhaseOrchestrator::with_defaults(Arc::new(InMemoryRepository::new()));

        let phase = orchestrator.lock_phase(1).await;
        let table = orchestrator.lock_tournament(1).await;

        let locks = orchestrator.tournament_locks.read().await;
        let lock = locks.get(&1).cloned().unwrap();
        drop(locks);
        assert!(lock.try_lock().is_err());
        drop(table);
        assert!(lock.try_lock().is_ok());
        drop(phase);
    }

    #[tokio::test]
    async fn test_phase_lock_is_shared_per_phase() {
        let orchestrator = PhaseOrchestrator::with_defaults(Arc::new(InMemoryRepository::new()));

        let guard = orchestrator.lock_phase(1).await;
        // A different phase is not blocked
        let other = orchestrator.lock_phase(2).await;
        drop(other);

        let locks = orchestrator.phase_locks.read().await;
        let lock = locks.get(&1).cloned().unwrap();
        drop(locks);
        assert!(lock.try_lock().is_err());
        drop(guard);
        assert!(lock.try_lock().is_ok());
    }
}
